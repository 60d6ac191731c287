use crate::merger::dtos::DivisionCode;
use crate::utils::{ImportError, Result};
use std::collections::HashMap;

/// An identifier namespace divisions can be looked up by.
#[derive(Debug, Clone, Copy)]
pub struct Seeker {
    pub name: &'static str,
    pub title: &'static str,
    validate: fn(&str) -> bool,
}

impl Seeker {
    pub const fn new(name: &'static str, title: &'static str, validate: fn(&str) -> bool) -> Self {
        Self {
            name,
            title,
            validate,
        }
    }

    pub fn is_valid(&self, value: &str) -> bool {
        (self.validate)(value)
    }
}

fn is_katottg(value: &str) -> bool {
    value.len() == 19
        && value.starts_with("UA")
        && value[2..].bytes().all(|b| b.is_ascii_digit())
}

fn is_koatuu(value: &str) -> bool {
    value.len() == 10 && value.bytes().all(|b| b.is_ascii_digit())
}

fn is_iso3166(value: &str) -> bool {
    value.len() == 2 && value.bytes().all(|b| b.is_ascii_uppercase())
}

pub const KATOTTG_SEEKER: Seeker = Seeker::new(
    "KATOTTG",
    "Codifier of administrative-territorial units and territories of territorial communities",
    is_katottg,
);
pub const KOATUU_SEEKER: Seeker = Seeker::new(
    "KOATUU",
    "Classifier of objects of the administrative-territorial system of Ukraine",
    is_koatuu,
);
pub const ISO3166_SEEKER: Seeker = Seeker::new("ISO3166", "ISO 3166-1 alpha-2", is_iso3166);

#[derive(Debug, Clone, Default)]
pub struct SeekerRegistry {
    seekers: HashMap<&'static str, Seeker>,
}

impl SeekerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for seeker in [KATOTTG_SEEKER, KOATUU_SEEKER, ISO3166_SEEKER] {
            registry.register(seeker);
        }
        registry
    }

    /// Registers `seeker` unless one with the same name is present.
    /// Returns whether the registry changed.
    pub fn register(&mut self, seeker: Seeker) -> bool {
        if self.seekers.contains_key(seeker.name) {
            return false;
        }
        self.seekers.insert(seeker.name, seeker);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seekers.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Seeker> {
        self.seekers.get(name)
    }

    pub fn validate(&self, code: &DivisionCode) -> Result<()> {
        let seeker = self
            .get(code.seeker())
            .ok_or_else(|| ImportError::UnknownSeeker(code.seeker().to_string()))?;

        if !seeker.is_valid(code.value()) {
            return Err(ImportError::InvalidCode {
                seeker: code.seeker().to_string(),
                value: code.value().to_string(),
            });
        }
        Ok(())
    }
}
