//! Port mappings
//!
//! Mappings come from two comma separated lists (source ports and destination
//! ports) that are paired by position. They are turned into explicit records
//! once, at startup, so nothing downstream indexes two parallel lists.

use std::fmt;
use thiserror::Error;

/// Errors produced while pairing port lists
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("source port list has {source_count} entries but destination port list has {destination_count}; both lists need the same number of ports")]
    LengthMismatch {
        source_count: usize,
        destination_count: usize,
    },

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("no port mappings configured")]
    Empty,
}

/// One inbound (IPv4) listen port paired with one outbound (IPv6) port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mapping {
    pub source_port: u16,
    pub destination_port: u16,
}

impl Mapping {
    pub fn new(source_port: u16, destination_port: u16) -> Self {
        Self {
            source_port,
            destination_port,
        }
    }

    /// Pair two comma separated port lists by position
    ///
    /// `"8080,7070"` and `"80,443"` yield `8080 -> 80` and `7070 -> 443`.
    pub fn pair_lists(sources: &str, destinations: &str) -> Result<Vec<Mapping>, MappingError> {
        let sources = parse_port_list(sources)?;
        let destinations = parse_port_list(destinations)?;

        if sources.len() != destinations.len() {
            return Err(MappingError::LengthMismatch {
                source_count: sources.len(),
                destination_count: destinations.len(),
            });
        }

        if sources.is_empty() {
            return Err(MappingError::Empty);
        }

        Ok(sources
            .into_iter()
            .zip(destinations)
            .map(|(source_port, destination_port)| Mapping::new(source_port, destination_port))
            .collect())
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source_port, self.destination_port)
    }
}

fn parse_port_list(list: &str) -> Result<Vec<u16>, MappingError> {
    if list.trim().is_empty() {
        return Ok(Vec::new());
    }

    list.split(',')
        .map(str::trim)
        .map(|port| {
            port.parse::<u16>()
                .map_err(|_| MappingError::InvalidPort(port.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_lists_by_position() {
        let mappings = Mapping::pair_lists("8080,7070", "80,443").unwrap();
        assert_eq!(
            mappings,
            vec![Mapping::new(8080, 80), Mapping::new(7070, 443)]
        );
    }

    #[test]
    fn test_pair_lists_trims_whitespace() {
        let mappings = Mapping::pair_lists(" 8080 , 7070", "80, 443 ").unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[1], Mapping::new(7070, 443));
    }

    #[test]
    fn test_pair_lists_length_mismatch() {
        let err = Mapping::pair_lists("8080,7070", "80").unwrap_err();
        assert_eq!(
            err,
            MappingError::LengthMismatch {
                source_count: 2,
                destination_count: 1
            }
        );
    }

    #[test]
    fn test_pair_lists_invalid_port() {
        assert_eq!(
            Mapping::pair_lists("8080", "http").unwrap_err(),
            MappingError::InvalidPort("http".to_string())
        );
        assert!(Mapping::pair_lists("70000", "80").is_err());
        assert!(Mapping::pair_lists("8080,", "80,443").is_err());
    }

    #[test]
    fn test_pair_lists_empty() {
        assert_eq!(Mapping::pair_lists("", "").unwrap_err(), MappingError::Empty);
    }

    #[test]
    fn test_mapping_display() {
        assert_eq!(Mapping::new(8080, 80).to_string(), "8080 -> 80");
    }
}
