//! Global system settings.
//!
//! The layout of the settings blob is unknown. It is kept verbatim so it
//! can be displayed and individual bytes can be changed with
//! [`crate::commands::build_set_system_setting`].

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSettings {
    pub raw: Vec<u8>,
}

impl SystemSettings {
    pub fn from_bytes(data: &[u8]) -> Self {
        Self { raw: data.to_vec() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Byte at `index`, if the device reported that many.
    pub fn get(&self, index: usize) -> Option<u8> {
        self.raw.get(index).copied()
    }

    /// Space-separated lowercase hex.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SystemSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.raw.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
