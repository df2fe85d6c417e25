use crate::error::{Error, Result};
use crate::hash::DefaultHasher;
use crate::probe::HomePolicy;
use crate::table::{LightMap, MAX_FIELD_LEN};
use crate::traits::KeyHasher;

pub const DEFAULT_INITIAL_SLOTS: usize = 16;

pub const DEFAULT_LOAD_FACTOR: f64 = 0.8;

pub const DEFAULT_PROBE_STEP: usize = 5;

/// Map configuration builder
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub(crate) key_capacity: usize,
    pub(crate) value_capacity: usize,
    pub(crate) initial_slots: usize,
    pub(crate) load_factor: f64,
    pub(crate) probe_step: usize,
    pub(crate) home_policy: HomePolicy,
}

impl Config {
    /// Starts a configuration for keys of up to `key_capacity` bytes and
    /// values of up to `value_capacity` bytes. Both are fixed for the
    /// lifetime of the map and must fit in one length byte.
    #[must_use]
    pub fn new(key_capacity: usize, value_capacity: usize) -> Self {
        Self {
            key_capacity,
            value_capacity,
            initial_slots: DEFAULT_INITIAL_SLOTS,
            load_factor: DEFAULT_LOAD_FACTOR,
            probe_step: DEFAULT_PROBE_STEP,
            home_policy: HomePolicy::default(),
        }
    }

    /// Sets the slot count of the first allocation.
    ///
    /// Defaults to 16.
    #[must_use]
    pub fn initial_slots(mut self, slots: usize) -> Self {
        self.initial_slots = slots;
        self
    }

    /// Sets the fraction of slots that may be occupied before an insert
    /// grows the map.
    ///
    /// Defaults to 0.8.
    #[must_use]
    pub fn load_factor(mut self, load_factor: f64) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Sets the stride of the probe walk.
    ///
    /// Defaults to 5.
    #[must_use]
    pub fn probe_step(mut self, step: usize) -> Self {
        self.probe_step = step;
        self
    }

    #[must_use]
    pub fn home_policy(mut self, policy: HomePolicy) -> Self {
        self.home_policy = policy;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(1..=MAX_FIELD_LEN).contains(&self.key_capacity) {
            return Err(Error::InvalidConfig("key capacity must be within 1..=255"));
        }
        if self.value_capacity > MAX_FIELD_LEN {
            return Err(Error::InvalidConfig("value capacity must be within 0..=255"));
        }
        if self.initial_slots == 0 || self.initial_slots > crate::slot::MAX_SLOTS {
            return Err(Error::InvalidConfig("initial slot count out of range"));
        }
        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(Error::InvalidConfig("load factor must be within (0, 1]"));
        }
        if self.probe_step == 0 {
            return Err(Error::InvalidConfig("probe step must be at least 1"));
        }
        Ok(())
    }

    /// Allocates the map with the [`DefaultHasher`].
    pub fn build(self) -> Result<LightMap> {
        self.build_with_hasher(DefaultHasher)
    }

    pub fn build_with_hasher<H: KeyHasher>(self, hasher: H) -> Result<LightMap<H>> {
        self.validate()?;
        Ok(LightMap::from_config(&self, hasher))
    }
}
