//! Slot allocation
//!
//! Blade classes are packed back to back, in declaration order, into the
//! numbered slots of a chassis.

use crate::error::{ConfigurationError, ResolutionError, Result};

use super::catalog::Topology;

/// Slot of the first instance of `target` when the classes in
/// `ordered_classes` are packed in order.
///
/// A `target` missing from the list is a caller defect and reported as a
/// [`ResolutionError`]; a preceding class missing from the catalog is a
/// [`ConfigurationError`].
pub fn first_slot(topology: &Topology, ordered_classes: &[String], target: &str) -> Result<usize> {
    let mut slot = 0;
    for class in ordered_classes {
        if class == target {
            return Ok(slot);
        }
        slot += topology
            .blade_count(class)
            .ok_or_else(|| ConfigurationError::UnknownBladeClass(class.clone()))?;
    }
    Err(ResolutionError::BladeClassNotInList(target.to_string(), ordered_classes.to_vec()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::topology::catalog::BladeClass;

    fn topology() -> Topology {
        Topology {
            blade_classes: vec![
                BladeClass::new("mgmt", 1),
                BladeClass::new("compute", 2),
                BladeClass::new("storage", 3),
                BladeClass::new("empty", 0),
            ],
            ..Default::default()
        }
    }

    fn classes(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_cumulative_slots() {
        let topology = topology();
        let order = classes(&["mgmt", "compute", "empty", "storage"]);
        assert_eq!(first_slot(&topology, &order, "mgmt").unwrap(), 0);
        assert_eq!(first_slot(&topology, &order, "compute").unwrap(), 1);
        assert_eq!(first_slot(&topology, &order, "empty").unwrap(), 3);
        assert_eq!(first_slot(&topology, &order, "storage").unwrap(), 3);
    }

    #[test]
    fn test_order_matters() {
        let topology = topology();
        let order = classes(&["storage", "compute", "mgmt"]);
        assert_eq!(first_slot(&topology, &order, "compute").unwrap(), 3);
        assert_eq!(first_slot(&topology, &order, "mgmt").unwrap(), 5);
    }

    #[test]
    fn test_target_not_in_list() {
        let topology = topology();
        let result = first_slot(&topology, &classes(&["mgmt"]), "compute");
        assert!(matches!(
            result,
            Err(Error::Resolution(ResolutionError::BladeClassNotInList(name, _))) if name == "compute"
        ));
    }

    #[test]
    fn test_unknown_preceding_class() {
        let topology = topology();
        let result = first_slot(&topology, &classes(&["ghost", "mgmt"]), "mgmt");
        assert!(matches!(
            result,
            Err(Error::Configuration(ConfigurationError::UnknownBladeClass(name))) if name == "ghost"
        ));
    }
}
