/*
[INPUT]:  Pilot settings (MacCready, abort safety) and UI edit state
[OUTPUT]: Collaborator traits consumed by the task store, plus default impls
[POS]:    Integration layer - seams between the task engine and the rest of the flight computer
[UPDATE]: When the task engine needs new answers from outside
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::config::AbortSafetyConfig;

/// Glide computer settings touched by abort handling.
pub trait GlideSettings: Send + Sync {
    /// Current MacCready setting in m/s.
    fn mac_cready(&self) -> f64;
    fn set_mac_cready(&self, value: f64);
    /// Keep the current MacCready when aborting.
    fn abort_safety_use_current(&self) -> bool;
    /// MacCready ceiling applied when aborting.
    fn abort_safety_mac_cready(&self) -> f64;
}

/// Reports whether an operator is editing targets right now.
pub trait TargetEditSession: Send + Sync {
    fn is_active(&self) -> bool;
}

/// In-memory glide settings, seeded from configuration.
#[derive(Debug, Default)]
pub struct GlidePolarSettings {
    mac_cready: Mutex<f64>,
    abort_safety: AbortSafetyConfig,
}

impl GlidePolarSettings {
    pub fn new(mac_cready: f64, abort_safety: AbortSafetyConfig) -> Self {
        Self {
            mac_cready: Mutex::new(mac_cready),
            abort_safety,
        }
    }
}

impl GlideSettings for GlidePolarSettings {
    fn mac_cready(&self) -> f64 {
        *self.mac_cready.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_mac_cready(&self, value: f64) {
        *self.mac_cready.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    fn abort_safety_use_current(&self) -> bool {
        self.abort_safety.use_current
    }

    fn abort_safety_mac_cready(&self) -> f64 {
        self.abort_safety.mac_cready
    }
}

/// Edit session flag toggled by the target editing surface.
#[derive(Debug, Default)]
pub struct EditSessionFlag {
    active: AtomicBool,
}

impl EditSessionFlag {
    pub fn begin(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    pub fn end(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

impl TargetEditSession for EditSessionFlag {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
