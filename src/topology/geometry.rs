//! Cabinet geometry
//!
//! Turns the loosely typed `geometry.cabinets.river` section of the
//! application configuration into an ordered cabinet → chassis → blade
//! class tree. Cabinets and chassis are ordered numerically by id; blade
//! classes keep their declared order, which is also their slot order.

use serde::{Deserialize, Serialize};

use crate::config::application::RiverCabinets;
use crate::error::ConfigurationError;

/// One chassis and the blade classes packed into it, in slot order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chassis {
    pub id: u32,
    pub blade_classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cabinet {
    pub id: u32,
    pub chassis: Vec<Chassis>,
}

/// Typed view of the river cabinet geometry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub cabinets: Vec<Cabinet>,
}

fn parse_id(field: &str, value: &str) -> Result<u32, ConfigurationError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|e| ConfigurationError::InvalidField {
            field: field.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

impl Geometry {
    /// Build the geometry from the river cabinet settings
    pub fn from_river(river: &RiverCabinets) -> Result<Self, ConfigurationError> {
        let layout = river.blade_classes.as_ref().ok_or_else(|| {
            ConfigurationError::MissingField("geometry.cabinets.river.blade_classes".to_string())
        })?;

        let mut cabinets = Vec::with_capacity(layout.len());
        for (cabinet_key, chassis_map) in layout {
            let cabinet_id = parse_id("geometry.cabinets.river.blade_classes", cabinet_key)?;
            let mut chassis = Vec::with_capacity(chassis_map.len());
            for (chassis_key, blade_classes) in chassis_map {
                let field = format!("geometry.cabinets.river.blade_classes.{}", cabinet_key);
                chassis.push(Chassis {
                    id: parse_id(&field, chassis_key)?,
                    blade_classes: blade_classes.clone(),
                });
            }
            chassis.sort_by_key(|c| c.id);
            cabinets.push(Cabinet {
                id: cabinet_id,
                chassis,
            });
        }
        cabinets.sort_by_key(|c| c.id);

        Ok(Self { cabinets })
    }

    /// Cabinet ids in order
    pub fn cabinet_ids(&self) -> Vec<u32> {
        self.cabinets.iter().map(|c| c.id).collect()
    }
}
