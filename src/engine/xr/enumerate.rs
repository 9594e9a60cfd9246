use crate::engine::xr::runtime::Enumerated;
use crate::engine::{EngineError, EngineResult};

/// How many times the count is re-queried before giving up.
const MAX_ATTEMPTS: usize = 8;

/// Run a "query count, then fill" enumeration and return the owned result.
///
/// `call` is first invoked with an empty buffer to learn the count, then with
/// a buffer of exactly that size. When the runtime reports the buffer is too
/// small (the set grew between the two calls) the count is queried again.
pub fn enumerate_two_call<T, F>(call_name: &'static str, mut call: F) -> EngineResult<Vec<T>>
where
    T: Clone + Default,
    F: FnMut(&mut [T]) -> EngineResult<Enumerated>,
{
    let mut buffer: Vec<T> = Vec::new();

    for _ in 0..MAX_ATTEMPTS {
        let required = match call(&mut [])? {
            Enumerated::Count(n) | Enumerated::SizeInsufficient(n) => n as usize,
        };
        if required == 0 {
            return Ok(Vec::new());
        }

        buffer.clear();
        buffer.resize(required, T::default());

        match call(&mut buffer)? {
            Enumerated::Count(written) => {
                buffer.truncate(written as usize);
                return Ok(buffer);
            }
            Enumerated::SizeInsufficient(now) => {
                log::debug!("{call_name}: count changed from {required} to {now}, re-querying");
            }
        }
    }

    Err(EngineError::runtime(call_name, "count kept changing between calls"))
}
