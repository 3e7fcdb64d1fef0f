//! A [Loader] drives a [Vfs] and a [Decoder] to produce resources, and can be turned into the factory of a
//! [ReaderCache].
//!
//! Caches only understand absent handles, not errors, so the factory logs the error and hands back
//! `H::default()`.
use std::io::Error as IoError;

use log::error;

use crate::*;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("unable to open asset: {0}")]
    Vfs(#[source] IoError),
    #[error("unable to decode asset: {0}")]
    Decoder(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug)]
pub struct Loader<VfsImpl: Vfs, DecoderImpl: Decoder> {
    vfs: VfsImpl,
    decoder: DecoderImpl,
}

impl<VfsImpl: Vfs, DecoderImpl: Decoder> Loader<VfsImpl, DecoderImpl> {
    pub fn new(vfs: VfsImpl, decoder: DecoderImpl) -> Loader<VfsImpl, DecoderImpl> {
        Loader { vfs, decoder }
    }

    /// Open and decode one resource.
    pub fn load(&self, key: &str) -> Result<DecoderImpl::Output, LoadError> {
        let reader = self.vfs.open(key).map_err(LoadError::Vfs)?;
        self.decoder
            .decode(reader)
            .map_err(|e| LoadError::Decoder(Box::new(e)))
    }

    /// Build a cache factory which wraps decoded resources with `wrap`, e.g. `CompactSyncRc::new`.
    ///
    /// Failures are logged and produce the absent handle.
    pub fn into_factory<H, W>(self, wrap: W) -> impl FnMut(&str) -> H
    where
        H: CacheHandle + Default,
        W: Fn(DecoderImpl::Output) -> H,
    {
        move |key: &str| match self.load(key) {
            Ok(x) => wrap(x),
            Err(e) => {
                error!("{}: {}", key, e);
                H::default()
            }
        }
    }
}
