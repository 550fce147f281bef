use std::sync::Mutex;

use ulid::Generator;

/// Mints monotonically increasing, lexicographically sortable IDs.
///
/// A single [`Generator`] is shared behind a mutex so that two concurrent
/// mints within the same millisecond still produce strictly increasing IDs
/// instead of racing on timestamp ties.
pub struct IdGenerator {
    generator: Mutex<Generator>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            generator: Mutex::new(Generator::new()),
        }
    }

    pub fn next_id(&self) -> anyhow::Result<String> {
        let mut generator = self.generator.lock().expect("id generator mutex poisoned");
        let ulid = generator
            .generate()
            .map_err(|e| anyhow::anyhow!("failed to mint monotonic id: {e}"))?;
        Ok(ulid.to_string())
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing() {
        let gen = IdGenerator::new();
        let mut last = gen.next_id().unwrap();
        for _ in 0..1000 {
            let next = gen.next_id().unwrap();
            assert!(next > last, "{next} should sort after {last}");
            last = next;
        }
    }
}
