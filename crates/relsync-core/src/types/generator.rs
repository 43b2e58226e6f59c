use crate::error::{ErrorOrigin, InternalError};
use std::sync::{LazyLock, Mutex};
use ulid::Ulid;

///
/// GENERATOR is lazily initiated with a Mutex
/// it has to keep state to make sure key order is maintained
///

static GENERATOR: LazyLock<Mutex<Generator>> = LazyLock::new(|| Mutex::new(Generator::default()));

/// Generate a ULID using the global monotonic generator.
pub fn generate() -> Result<Ulid, InternalError> {
    let mut generator = GENERATOR.lock().map_err(|_| {
        InternalError::invariant(ErrorOrigin::Transaction, "ULID generator mutex poisoned")
    })?;

    generator.generate()
}

///
/// Generator
///
/// Monotonic wrapper over `Ulid::new`: within the same millisecond (or if the
/// clock goes backwards) the previous key is incremented instead.
///

#[derive(Default)]
pub struct Generator {
    previous: Ulid,
}

impl Generator {
    pub fn generate(&mut self) -> Result<Ulid, InternalError> {
        let candidate = Ulid::new();

        if candidate.timestamp_ms() <= self.previous.timestamp_ms() {
            let next = self.previous.increment().ok_or_else(|| {
                InternalError::invariant(ErrorOrigin::Transaction, "ULID generator overflow")
            })?;
            self.previous = next;

            return Ok(next);
        }

        self.previous = candidate;

        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_generation() {
        let mut g = Generator::default();
        let a = g.generate().unwrap();
        let b = g.generate().unwrap();
        let c = g.generate().unwrap();

        assert!(a < b);
        assert!(b < c);
    }
}
