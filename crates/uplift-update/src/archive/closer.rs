//! Ordered closing of stacked readers
//!
//! An extracted entry reads through a chain of layers: entry, container
//! reader, decompressor, transport. Each layer is held in a [`Layer`] handle
//! so the chain can be read through one end while a [`SequencedCloser`]
//! keeps ownership of every layer and releases them innermost first.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Something that can be closed once
pub trait Close: Send {
    /// Release the underlying resource
    fn close(&mut self) -> io::Result<()>;
}

/// A transport stream handed to the extractor
///
/// `close` runs when the extracted file is closed, after every layer built on
/// top of it.
pub trait ReadClose: Read + Send {
    /// Release the transport; dropping is enough by default
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ReadClose for std::fs::File {}

/// Wraps any reader as a transport that needs no explicit close
#[derive(Debug)]
pub struct NopCloser<R>(pub R);

impl<R: Read> Read for NopCloser<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read + Send> ReadClose for NopCloser<R> {}

type CloseFn<T> = fn(&mut T) -> io::Result<()>;

/// Shared handle to one reader in the chain
///
/// Handles are cheap to clone; every clone reads from the same underlying
/// reader. Once the layer is closed, reads fail.
pub struct Layer<T> {
    inner: Arc<Mutex<Option<T>>>,
    name: &'static str,
}

impl<T> Clone for Layer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            name: self.name,
        }
    }
}

impl<T> fmt::Debug for Layer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer").field("name", &self.name).finish()
    }
}

impl<T: Send + 'static> Layer<T> {
    /// Wrap `value`, returning the read handle and the closer that owns it
    pub fn new(value: T, name: &'static str, close: CloseFn<T>) -> (Self, NamedCloser) {
        let inner = Arc::new(Mutex::new(Some(value)));
        let closer = LayerCloser {
            inner: Arc::clone(&inner),
            close,
        };
        (
            Self { inner, name },
            NamedCloser {
                name,
                closer: Box::new(closer),
            },
        )
    }

    /// Run `f` against the wrapped value, if the layer is still open
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> io::Result<R> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::other(format!("{} lock poisoned", self.name)))?;
        match guard.as_mut() {
            Some(value) => Ok(f(value)),
            None => Err(io::Error::other(format!("{} is closed", self.name))),
        }
    }
}

impl<T: Read + Send + 'static> Read for Layer<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.with(|r| r.read(buf))?
    }
}

struct LayerCloser<T> {
    inner: Arc<Mutex<Option<T>>>,
    close: CloseFn<T>,
}

impl<T: Send> Close for LayerCloser<T> {
    fn close(&mut self) -> io::Result<()> {
        let taken = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("layer lock poisoned"))?
            .take();

        match taken {
            Some(mut value) => (self.close)(&mut value),
            None => Ok(()),
        }
    }
}

/// A closer labelled for logging
pub struct NamedCloser {
    name: &'static str,
    closer: Box<dyn Close>,
}

impl NamedCloser {
    /// Label an arbitrary closer
    pub fn new(name: &'static str, closer: Box<dyn Close>) -> Self {
        Self { name, closer }
    }
}

impl fmt::Debug for NamedCloser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedCloser").field(&self.name).finish()
    }
}

/// Closes a chain of layers in order
///
/// Closing stops at the first failure and reports it. The failed closer is
/// not retried and the remaining ones stay open until the next `close` call
/// or until dropped.
#[derive(Debug, Default)]
pub struct SequencedCloser {
    closers: VecDeque<NamedCloser>,
}

impl SequencedCloser {
    /// Empty closer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a closer; closers run in insertion order
    pub fn push(&mut self, closer: NamedCloser) {
        self.closers.push_back(closer);
    }

    /// Number of closers not yet run
    pub fn remaining(&self) -> usize {
        self.closers.len()
    }

    /// Close every remaining layer in order
    pub fn close(&mut self) -> io::Result<()> {
        while let Some(mut next) = self.closers.pop_front() {
            debug!("Closing {}", next.name);
            next.closer.close()?;
        }
        Ok(())
    }
}
