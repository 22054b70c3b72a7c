use std::fmt;
use std::sync::Arc;

use nalgebra::Vector3;

use crate::error::{Error, Result};

/// Boolean predicate over a body's position deciding continued inclusion in
/// the simulation. Two arities are supported: 3 (the body's own `x, y, z`)
/// and 6 (the body's coordinates followed by the tracked body's). The
/// predicate returns `true` while the body should stay alive.
#[derive(Clone)]
pub struct AlivePredicate {
    func: Arc<dyn Fn(&[f64]) -> bool + Send + Sync>,
    arity: usize,
}

impl AlivePredicate {
    /// Wraps a raw slice predicate with a declared arity. Any arity other
    /// than 3 or 6 is a configuration error.
    pub fn new<F>(arity: usize, func: F) -> Result<Self>
    where
        F: Fn(&[f64]) -> bool + Send + Sync + 'static,
    {
        if arity != 3 && arity != 6 {
            return Err(Error::InvalidPredicateArity(arity));
        }
        Ok(Self {
            func: Arc::new(func),
            arity,
        })
    }

    /// A 3-parameter predicate over the body's own coordinates.
    pub fn absolute<F>(func: F) -> Self
    where
        F: Fn(f64, f64, f64) -> bool + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(move |args| func(args[0], args[1], args[2])),
            arity: 3,
        }
    }

    /// A 6-parameter predicate over the body's coordinates and the tracked
    /// body's coordinates.
    pub fn relative<F>(func: F) -> Self
    where
        F: Fn(f64, f64, f64, f64, f64, f64) -> bool + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(move |args| {
                func(args[0], args[1], args[2], args[3], args[4], args[5])
            }),
            arity: 6,
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Evaluates the predicate. A 6-ary predicate requires a tracked body;
    /// calling one without is a configuration error surfaced here rather
    /// than a silent pass.
    pub fn is_alive(
        &self,
        position: Vector3<f64>,
        tracked: Option<Vector3<f64>>,
    ) -> Result<bool> {
        match self.arity {
            3 => Ok((self.func)(&[position.x, position.y, position.z])),
            6 => {
                let tracked = tracked.ok_or_else(|| {
                    Error::InvalidParameter(
                        "6-parameter alive predicate requires a tracked body".to_string(),
                    )
                })?;
                Ok((self.func)(&[
                    position.x, position.y, position.z, tracked.x, tracked.y, tracked.z,
                ]))
            }
            other => Err(Error::InvalidPredicateArity(other)),
        }
    }
}

impl fmt::Debug for AlivePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlivePredicate")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}
