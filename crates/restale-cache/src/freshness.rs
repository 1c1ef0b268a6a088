//! HTTP freshness model
//!
//! Derives an immutable freshness snapshot from the `Age` and
//! `Cache-Control` headers at response-capture time. Only the four
//! directives this library models are parsed: `Age`, `max-age`,
//! `stale-while-revalidate` and `stale-if-error`. Malformed values are
//! logged and treated as absent, never fatal.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Convert a wall-clock timestamp to whole seconds since the Unix epoch
fn epoch_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Immutable freshness metadata captured alongside a response
///
/// `created_at` and `expires_at` are fixed at parse time; staleness queries
/// recompute the current age from the supplied clock and never mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Freshness {
    /// Age in seconds as reported by the origin at capture time
    age: u64,
    /// `max-age` directive in seconds (0 when absent)
    max_age: u64,
    /// `stale-while-revalidate` directive in seconds (0 when absent)
    stale_while_revalidate: u64,
    /// `stale-if-error` directive in seconds (0 when absent)
    stale_if_error: u64,
    /// Capture time minus age, as seconds since the Unix epoch
    created_at_secs: u64,
    /// Derived expiry, as seconds since the Unix epoch
    expires_at_secs: u64,
}

impl Freshness {
    /// Build freshness metadata from already-parsed directive values
    ///
    /// `created_at` is `captured_at - age`. The entry is already stale at
    /// capture when `max_age <= age`, in which case `expires_at` equals
    /// `created_at`.
    pub fn new(
        age: u64,
        max_age: u64,
        stale_while_revalidate: u64,
        stale_if_error: u64,
        captured_at: SystemTime,
    ) -> Self {
        let created_at_secs = epoch_secs(captured_at).saturating_sub(age);
        let expires_at_secs = if max_age <= age {
            created_at_secs
        } else {
            // Directive values are origin-controlled and may be u64::MAX
            created_at_secs.saturating_add(max_age)
        };

        Self {
            age,
            max_age,
            stale_while_revalidate,
            stale_if_error,
            created_at_secs,
            expires_at_secs,
        }
    }

    /// Parse freshness metadata from raw header values
    ///
    /// Both headers may be absent or malformed; every directive defaults
    /// to 0 in that case.
    pub fn from_headers(
        age: Option<&str>,
        cache_control: Option<&str>,
        captured_at: SystemTime,
    ) -> Self {
        let age = age.map_or(0, parse_age);
        let (max_age, stale_while_revalidate, stale_if_error) =
            cache_control.map_or((0, 0, 0), |value| {
                (
                    directive_value(value, "max-age"),
                    directive_value(value, "stale-while-revalidate"),
                    directive_value(value, "stale-if-error"),
                )
            });

        Self::new(
            age,
            max_age,
            stale_while_revalidate,
            stale_if_error,
            captured_at,
        )
    }

    /// Age reported by the origin at capture time, in seconds
    pub fn age(&self) -> u64 {
        self.age
    }

    /// `max-age` directive in seconds
    pub fn max_age(&self) -> u64 {
        self.max_age
    }

    /// `stale-while-revalidate` directive in seconds
    pub fn stale_while_revalidate(&self) -> u64 {
        self.stale_while_revalidate
    }

    /// `stale-if-error` directive in seconds
    pub fn stale_if_error(&self) -> u64 {
        self.stale_if_error
    }

    /// Wall-clock time the representation was created at the origin
    pub fn created_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.created_at_secs)
    }

    /// Wall-clock time the representation expires
    pub fn expires_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.expires_at_secs)
    }

    /// Seconds elapsed since `created_at` as of `now`
    pub fn current_age_at(&self, now: SystemTime) -> u64 {
        epoch_secs(now).saturating_sub(self.created_at_secs)
    }

    /// Whether the entry has passed its expiry as of `now`
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        epoch_secs(now) >= self.expires_at_secs
    }

    /// Whether the entry may still be served while a background refresh runs
    pub fn is_fresh_for_revalidate_at(&self, now: SystemTime) -> bool {
        self.current_age_at(now) < self.max_age.saturating_add(self.stale_while_revalidate)
    }

    /// Whether the entry may still be served in place of a failing fetch
    pub fn is_fresh_for_error_at(&self, now: SystemTime) -> bool {
        self.current_age_at(now) < self.max_age.saturating_add(self.stale_if_error)
    }

    /// [`Self::current_age_at`] against the current wall clock
    pub fn current_age(&self) -> u64 {
        self.current_age_at(SystemTime::now())
    }

    /// [`Self::is_expired_at`] against the current wall clock
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    /// [`Self::is_fresh_for_revalidate_at`] against the current wall clock
    pub fn is_fresh_for_revalidate(&self) -> bool {
        self.is_fresh_for_revalidate_at(SystemTime::now())
    }

    /// [`Self::is_fresh_for_error_at`] against the current wall clock
    pub fn is_fresh_for_error(&self) -> bool {
        self.is_fresh_for_error_at(SystemTime::now())
    }
}

/// Parse an `Age` header value, defaulting to 0 on malformed input
fn parse_age(value: &str) -> u64 {
    let trimmed = value.trim();
    match trimmed.parse::<u64>() {
        Ok(age) => age,
        Err(_) => {
            if !trimmed.is_empty() {
                warn!("Malformed Age header value '{trimmed}', treating as 0");
            }
            0
        }
    }
}

/// Extract the first non-negative integer value of a `Cache-Control`
/// directive, case-insensitively
///
/// Returns 0 when the directive is absent or every occurrence is malformed.
fn directive_value(cache_control: &str, directive: &str) -> u64 {
    for part in cache_control.split(',') {
        let Some((name, value)) = part.split_once('=') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case(directive) {
            continue;
        }
        match value.trim().parse::<u64>() {
            Ok(parsed) => return parsed,
            Err(_) => {
                warn!(
                    "Malformed {directive} value '{}' in Cache-Control, treating as absent",
                    value.trim()
                );
            }
        }
    }
    0
}
