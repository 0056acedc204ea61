use crate::Id;
use std::collections::{HashMap, HashSet};

/// Structure to generate unique names that are somewhat readable.
/// Seeded with every name already appearing in a module so that generated
/// names never collide with user-written ones.
#[derive(Clone, Debug, Default)]
pub struct NameGenerator {
    name_hash: HashMap<String, i64>,
    generated_names: HashSet<String>,
    // `_RAND_<n>` names come out of their own counter.
    rand_count: u64,
}

impl NameGenerator {
    /// Construct a generator that knows about the given set of names.
    pub fn with_prev_defined_names(names: HashSet<String>) -> Self {
        NameGenerator {
            generated_names: names,
            ..Default::default()
        }
    }

    /// Add a set of names to the set of used names.
    pub fn add_names(&mut self, names: HashSet<String>) {
        self.generated_names.extend(names);
    }

    /// Returns true iff this name has been defined or generated before.
    pub fn contains(&self, name: &str) -> bool {
        self.generated_names.contains(name)
    }

    /// Return a fresh name of the form `{prefix}_{n}`, skipping over any
    /// name already defined or generated.
    pub fn gen_name<S: ToString>(&mut self, prefix: S) -> Id {
        let prefix = prefix.to_string();
        loop {
            let count = *self.name_hash.get(&prefix).unwrap_or(&0);
            self.name_hash.insert(prefix.clone(), count + 1);
            let name = format!("{}_{}", prefix, count);
            if self.generated_names.insert(name.clone()) {
                return Id::from(name);
            }
        }
    }

    /// Return the next name from the dedicated randomization counter:
    /// `_RAND_0`, `_RAND_1`, ...
    pub fn rand_name(&mut self) -> Id {
        loop {
            let name = format!("_RAND_{}", self.rand_count);
            self.rand_count += 1;
            if self.generated_names.insert(name.clone()) {
                return Id::from(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_names_skip_defined_ones() {
        let mut ng = NameGenerator::with_prev_defined_names(
            ["_T_0".to_string(), "x".to_string()].into(),
        );
        assert_eq!(ng.gen_name("_T"), "_T_1");
        assert_eq!(ng.gen_name("_T"), "_T_2");
        assert_eq!(ng.gen_name("x"), "x_0");
    }

    #[test]
    fn rand_counter_is_dedicated() {
        let mut ng = NameGenerator::default();
        ng.gen_name("_T");
        assert_eq!(ng.rand_name(), "_RAND_0");
        assert_eq!(ng.rand_name(), "_RAND_1");
    }
}
