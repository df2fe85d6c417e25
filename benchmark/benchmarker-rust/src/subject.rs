use hashbrown::HashMap as HashbrownMap;
use lightmap::LightMap;
use std::collections::HashMap as StdMap;

/// A map under measurement.
pub trait Subject: Sized {
    const NAME: &'static str;
    fn new(key_capacity: usize, value_capacity: usize) -> lightmap::Result<Self>;
    /// Returns `false` if the map refused the entry.
    fn build(&mut self, key: &str, value: &str) -> bool;
    fn probe(&self, key: &str) -> Option<usize>;
    fn len(&self) -> usize;
    fn report(&self) {}
}

impl Subject for LightMap {
    const NAME: &'static str = "lightmap";

    fn new(key_capacity: usize, value_capacity: usize) -> lightmap::Result<Self> {
        LightMap::new(key_capacity, value_capacity)
    }

    fn build(&mut self, key: &str, value: &str) -> bool {
        match self.put(key, value) {
            Ok(_) => true,
            Err(error) => {
                log::warn!("put {key:?} failed: {error}");
                false
            }
        }
    }

    fn probe(&self, key: &str) -> Option<usize> {
        self.get(key).map(<[u8]>::len)
    }

    fn len(&self) -> usize {
        LightMap::len(self)
    }

    fn report(&self) {
        let diagnostics = self.diagnostics();
        log::info!(
            "{} of {} slots empty ({:.1}%), {} bytes per slot, buffer {} bytes",
            diagnostics.empty_slots,
            diagnostics.total_slots,
            diagnostics.empty_ratio * 100.0,
            self.slot_len(),
            diagnostics.buffer_bytes,
        );
    }
}

impl Subject for HashbrownMap<Box<[u8]>, Box<[u8]>> {
    const NAME: &'static str = "hashbrown";

    fn new(_: usize, _: usize) -> lightmap::Result<Self> {
        Ok(Self::new())
    }

    fn build(&mut self, key: &str, value: &str) -> bool {
        self.insert(key.as_bytes().into(), value.as_bytes().into());
        true
    }

    fn probe(&self, key: &str) -> Option<usize> {
        self.get(key.as_bytes()).map(|value| value.len())
    }

    fn len(&self) -> usize {
        HashbrownMap::len(self)
    }
}

impl Subject for StdMap<String, String> {
    const NAME: &'static str = "std";

    fn new(_: usize, _: usize) -> lightmap::Result<Self> {
        Ok(Self::new())
    }

    fn build(&mut self, key: &str, value: &str) -> bool {
        self.insert(key.to_owned(), value.to_owned());
        true
    }

    fn probe(&self, key: &str) -> Option<usize> {
        self.get(key).map(String::len)
    }

    fn len(&self) -> usize {
        StdMap::len(self)
    }
}
