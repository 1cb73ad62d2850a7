use std::sync::atomic::{AtomicU8, Ordering};

/// Cached knowledge of whether the primary backend is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceAvailability {
    Unknown,
    Available,
    Unavailable,
}

impl ServiceAvailability {
    fn as_u8(self) -> u8 {
        match self {
            ServiceAvailability::Unknown => 0,
            ServiceAvailability::Available => 1,
            ServiceAvailability::Unavailable => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ServiceAvailability::Available,
            2 => ServiceAvailability::Unavailable,
            _ => ServiceAvailability::Unknown,
        }
    }

    /// Anything but an explicit `Unavailable` is worth a try.
    pub fn should_try_primary(self) -> bool {
        self != ServiceAvailability::Unavailable
    }
}

impl std::fmt::Display for ServiceAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServiceAvailability::Unknown => "unknown",
            ServiceAvailability::Available => "available",
            ServiceAvailability::Unavailable => "unavailable",
        };
        write!(f, "{}", s)
    }
}

/// Tri-state flag shared by concurrent checks. Last writer wins.
#[derive(Debug)]
pub struct AvailabilityCache {
    state: AtomicU8,
}

impl Default for AvailabilityCache {
    fn default() -> Self {
        AvailabilityCache::new()
    }
}

impl AvailabilityCache {
    pub fn new() -> Self {
        AvailabilityCache {
            state: AtomicU8::new(ServiceAvailability::Unknown.as_u8()),
        }
    }

    pub fn get(&self) -> ServiceAvailability {
        ServiceAvailability::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// Stores `next`, returning the previous value.
    pub fn set(&self, next: ServiceAvailability) -> ServiceAvailability {
        let previous = ServiceAvailability::from_u8(self.state.swap(next.as_u8(), Ordering::Relaxed));
        if previous != next {
            log::debug!("primary backend availability: {} -> {}", previous, next);
        }
        previous
    }

    pub fn record(&self, available: bool) {
        self.set(if available {
            ServiceAvailability::Available
        } else {
            ServiceAvailability::Unavailable
        });
    }
}
