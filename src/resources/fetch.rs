//! Byte sources for assets.
//!
//! On the web assets are requested from `<origin>/assets/` with `reqwest`; natively they
//! are read from an `assets/` directory with `tokio::fs`.

use std::rc::Rc;

use futures::future::LocalBoxFuture;

pub trait Fetch {
    fn fetch<'a>(&'a self, src: &'a str) -> LocalBoxFuture<'a, anyhow::Result<Vec<u8>>>;
}

/// Resolve a path referenced from inside another asset (an MTL next to its OBJ, a glTF
/// buffer next to its document).
pub fn resolve_relative(base_src: &str, relative: &str) -> String {
    if relative.starts_with('/') || relative.contains("://") {
        return relative.to_string();
    }
    match base_src.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{relative}"),
        None => relative.to_string(),
    }
}

pub fn default_fetcher() -> Rc<dyn Fetch> {
    #[cfg(target_arch = "wasm32")]
    {
        Rc::new(HttpFetcher::from_location())
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Rc::new(FileFetcher::new("./assets"))
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub struct FileFetcher {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileFetcher {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Fetch for FileFetcher {
    fn fetch<'a>(&'a self, src: &'a str) -> LocalBoxFuture<'a, anyhow::Result<Vec<u8>>> {
        use anyhow::Context;
        use futures::FutureExt;

        async move {
            let path = self.root.join(src.trim_start_matches('/'));
            tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))
        }
        .boxed_local()
    }
}

#[cfg(target_arch = "wasm32")]
pub struct HttpFetcher {
    base: String,
}

#[cfg(target_arch = "wasm32")]
impl HttpFetcher {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// `<origin>/assets` of the current page.
    pub fn from_location() -> Self {
        let origin = web_sys::window()
            .and_then(|window| window.location().origin().ok())
            .unwrap_or_default();
        Self::new(format!("{origin}/assets"))
    }
}

#[cfg(target_arch = "wasm32")]
impl Fetch for HttpFetcher {
    fn fetch<'a>(&'a self, src: &'a str) -> LocalBoxFuture<'a, anyhow::Result<Vec<u8>>> {
        use futures::FutureExt;

        async move {
            let url = format!("{}/{}", self.base, src.trim_start_matches('/'));
            let bytes = reqwest::get(url).await?.error_for_status()?.bytes().await?;
            Ok(bytes.to_vec())
        }
        .boxed_local()
    }
}
