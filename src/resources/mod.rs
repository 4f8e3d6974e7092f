//! This module contains all logic for loading textures, fonts and models from
//! external files.
//!
//! Loads are fire-and-forget: [`AssetLoader::load`] returns a typed handle
//! immediately and the fetch and decode run on the async runtime. Finished
//! loads come back over a completion channel that the frame loop drains between
//! ticks with [`AssetLoader::poll`]. Code that needs an asset registers a
//! continuation with [`AssetLoader::when_ready`]; it runs once every asset it
//! depends on is ready, and never if one of them fails.
//!
//! Decoded data is held only while something can still reach it: a live
//! [`Handle`] or a continuation that has not run yet. Everything else is
//! released at the end of the next poll.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    future::Future,
    marker::PhantomData,
    sync::{Arc, Weak},
};

use log::{debug, info, warn};
use thiserror::Error;

use crate::{data_structures::model::TextureData, scene::Scene};

pub mod font;
pub mod gltf_model;
pub mod text;

use font::{Font, FontError};
use gltf_model::ModelAsset;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not fetch {path}: {message}")]
    Fetch { path: String, message: String },
    #[error("could not decode image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("could not decode font {path}: {source}")]
    Font {
        path: String,
        #[source]
        source: FontError,
    },
    #[error("could not decode model {path}: {source}")]
    Model {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("{path}: {reason}")]
    Unsupported { path: String, reason: String },
}

/// Where asset paths are resolved: a directory natively, a URL prefix on the web.
#[derive(Clone, Debug)]
pub struct AssetSource {
    root: String,
}

impl AssetSource {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    #[cfg(target_arch = "wasm32")]
    fn format_url(&self, file_name: &str) -> Result<reqwest::Url, LoadError> {
        let fetch_err = |message: String| LoadError::Fetch {
            path: file_name.to_string(),
            message,
        };
        let window = web_sys::window().ok_or_else(|| fetch_err("no window".into()))?;
        let origin = window
            .location()
            .origin()
            .map_err(|_| fetch_err("page has no origin".into()))?;
        let base = reqwest::Url::parse(&format!("{}/{}/", origin, self.root.trim_matches('/')))
            .map_err(|e| fetch_err(e.to_string()))?;
        base.join(file_name).map_err(|e| fetch_err(e.to_string()))
    }

    pub async fn load_string(&self, file_name: &str) -> Result<String, LoadError> {
        let bytes = self.load_binary(file_name).await?;
        String::from_utf8(bytes).map_err(|e| LoadError::Unsupported {
            path: file_name.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn load_binary(&self, file_name: &str) -> Result<Vec<u8>, LoadError> {
        #[cfg(target_arch = "wasm32")]
        let data = {
            let url = self.format_url(file_name)?;
            let fetch_err = |e: reqwest::Error| LoadError::Fetch {
                path: file_name.to_string(),
                message: e.to_string(),
            };
            let response = reqwest::get(url)
                .await
                .and_then(|r| r.error_for_status())
                .map_err(fetch_err)?;
            response.bytes().await.map_err(fetch_err)?.to_vec()
        };
        #[cfg(not(target_arch = "wasm32"))]
        let data = {
            let path = std::path::Path::new(&self.root).join(file_name);
            tokio::fs::read(&path).await.map_err(|source| LoadError::Io {
                path: path.display().to_string(),
                source,
            })?
        };

        Ok(data)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Texture,
    Font,
    Model,
}

/// A decoded resource.
#[derive(Clone, Debug)]
pub enum Asset {
    Texture(Arc<TextureData>),
    Font(Arc<Font>),
    Model(Arc<ModelAsset>),
}

/// Types a [`Handle`] can point at.
pub trait AssetType: Send + Sync + 'static {
    const KIND: AssetKind;

    fn from_asset(asset: &Asset) -> Option<Arc<Self>>;
}

impl AssetType for TextureData {
    const KIND: AssetKind = AssetKind::Texture;

    fn from_asset(asset: &Asset) -> Option<Arc<Self>> {
        match asset {
            Asset::Texture(texture) => Some(texture.clone()),
            _ => None,
        }
    }
}

impl AssetType for Font {
    const KIND: AssetKind = AssetKind::Font;

    fn from_asset(asset: &Asset) -> Option<Arc<Self>> {
        match asset {
            Asset::Font(font) => Some(font.clone()),
            _ => None,
        }
    }
}

impl AssetType for ModelAsset {
    const KIND: AssetKind = AssetKind::Model;

    fn from_asset(asset: &Asset) -> Option<Arc<Self>> {
        match asset {
            Asset::Model(model) => Some(model.clone()),
            _ => None,
        }
    }
}

async fn fetch(source: &AssetSource, kind: AssetKind, path: &str) -> Result<Asset, LoadError> {
    match kind {
        AssetKind::Texture => {
            let bytes = source.load_binary(path).await?;
            Ok(Asset::Texture(Arc::new(decode_texture(path, &bytes)?)))
        }
        AssetKind::Font => {
            let bytes = source.load_binary(path).await?;
            let font = Font::from_slice(&bytes).map_err(|source| LoadError::Font {
                path: path.to_string(),
                source,
            })?;
            Ok(Asset::Font(Arc::new(font)))
        }
        AssetKind::Model => Ok(Asset::Model(Arc::new(
            gltf_model::load_model(source, path).await?,
        ))),
    }
}

pub(crate) fn decode_texture(label: &str, bytes: &[u8]) -> Result<TextureData, LoadError> {
    let image = image::load_from_memory(bytes).map_err(|source| LoadError::Image {
        path: label.to_string(),
        source,
    })?;
    Ok(TextureData::new(label, image.to_rgba8()))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u64);

/// Typed reference to an asset that may still be loading.
///
/// The loaded data stays available while any clone of the handle is alive.
pub struct Handle<T> {
    id: AssetId,
    live: Arc<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub fn id(&self) -> AssetId {
        self.id
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            live: self.live.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle<{}>({})", std::any::type_name::<T>(), self.id.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetStatus {
    Loading,
    Ready,
    Failed,
}

/// Decoded assets that are still referenced.
#[derive(Debug, Default)]
pub struct Assets {
    ready: HashMap<AssetId, Asset>,
}

impl Assets {
    pub fn get<T: AssetType>(&self, handle: &Handle<T>) -> Option<Arc<T>> {
        self.ready.get(&handle.id).and_then(T::from_asset)
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.ready.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }
}

/// Runs load tasks: on the tokio runtime natively, on the browser's microtask
/// queue on the web.
#[derive(Clone, Debug)]
pub struct Spawner {
    #[cfg(not(target_arch = "wasm32"))]
    handle: tokio::runtime::Handle,
}

impl Spawner {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn new() -> Self {
        Self {}
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(task);
    }

    #[cfg(target_arch = "wasm32")]
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + 'static,
    {
        wasm_bindgen_futures::spawn_local(task);
    }
}

struct Completion {
    id: AssetId,
    result: Result<Asset, LoadError>,
}

type Continuation = Box<dyn FnOnce(&mut Scene, &Assets)>;

struct Join {
    deps: Vec<AssetId>,
    run: Continuation,
}

/// What one [`AssetLoader::poll`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    pub loaded: usize,
    pub failed: usize,
    pub continuations_run: usize,
    pub continuations_dropped: usize,
    pub released: usize,
}

pub struct AssetLoader {
    source: AssetSource,
    spawner: Spawner,
    sender: async_channel::Sender<Completion>,
    receiver: async_channel::Receiver<Completion>,
    next_id: u64,
    paths: HashMap<AssetId, String>,
    handles: HashMap<AssetId, Weak<()>>,
    assets: Assets,
    loaded: HashSet<AssetId>,
    failed: HashSet<AssetId>,
    joins: Vec<Join>,
}

impl AssetLoader {
    pub fn new(source: AssetSource, spawner: Spawner) -> Self {
        let (sender, receiver) = async_channel::unbounded();
        Self {
            source,
            spawner,
            sender,
            receiver,
            next_id: 0,
            paths: HashMap::new(),
            handles: HashMap::new(),
            assets: Assets::default(),
            loaded: HashSet::new(),
            failed: HashSet::new(),
            joins: Vec::new(),
        }
    }

    pub fn source(&self) -> &AssetSource {
        &self.source
    }

    /// Start loading `path` in the background.
    pub fn load<T: AssetType>(&mut self, path: &str) -> Handle<T> {
        let id = AssetId(self.next_id);
        self.next_id += 1;
        self.paths.insert(id, path.to_string());
        debug!("loading {:?} {path}", T::KIND);

        let source = self.source.clone();
        let sender = self.sender.clone();
        let path = path.to_string();
        self.spawner.spawn(async move {
            let result = fetch(&source, T::KIND, &path).await;
            if sender.send(Completion { id, result }).await.is_err() {
                debug!("loader dropped before {path} finished");
            }
        });

        let live = Arc::new(());
        self.handles.insert(id, Arc::downgrade(&live));
        Handle {
            id,
            live,
            _marker: PhantomData,
        }
    }

    /// Run `continuation` once every asset in `deps` is ready.
    ///
    /// Continuations run on the frame loop's context, inside [`poll`](Self::poll),
    /// in the order they were registered. If any dependency fails the
    /// continuation is dropped without running.
    pub fn when_ready<F>(&mut self, deps: &[AssetId], continuation: F)
    where
        F: FnOnce(&mut Scene, &Assets) + 'static,
    {
        self.joins.push(Join {
            deps: deps.to_vec(),
            run: Box::new(continuation),
        });
    }

    /// [`when_ready`](Self::when_ready) for a single typed asset.
    pub fn on_ready<T, F>(&mut self, handle: Handle<T>, continuation: F)
    where
        T: AssetType,
        F: FnOnce(&mut Scene, Arc<T>) + 'static,
    {
        self.when_ready(&[handle.id()], move |scene, assets| {
            if let Some(asset) = assets.get(&handle) {
                continuation(scene, asset);
            }
        });
    }

    /// Drain finished loads and run every continuation that became runnable.
    pub fn poll(&mut self, scene: &mut Scene) -> PollReport {
        let mut report = PollReport::default();
        while let Ok(Completion { id, result }) = self.receiver.try_recv() {
            let path = self.paths.get(&id).map(String::as_str).unwrap_or("?");
            match result {
                Ok(asset) => {
                    info!("loaded {path}");
                    self.assets.ready.insert(id, asset);
                    self.loaded.insert(id);
                    report.loaded += 1;
                }
                Err(e) => {
                    warn!("{e}");
                    self.failed.insert(id);
                    report.failed += 1;
                }
            }
        }
        if report.loaded == 0 && report.failed == 0 && self.joins.is_empty() {
            report.released = self.release_unreachable();
            return report;
        }

        for join in std::mem::take(&mut self.joins) {
            if let Some(failed) = join.deps.iter().find(|id| self.failed.contains(*id)) {
                let path = self.paths.get(failed).map(String::as_str).unwrap_or("?");
                warn!("skipping a continuation: {path} failed to load");
                report.continuations_dropped += 1;
            } else if let Some(released) = join
                .deps
                .iter()
                .find(|id| self.loaded.contains(*id) && !self.assets.contains(**id))
            {
                let path = self.paths.get(released).map(String::as_str).unwrap_or("?");
                warn!("skipping a continuation: {path} was already released");
                report.continuations_dropped += 1;
            } else if join.deps.iter().all(|id| self.assets.contains(*id)) {
                (join.run)(scene, &self.assets);
                report.continuations_run += 1;
            } else {
                self.joins.push(join);
            }
        }
        report.released = self.release_unreachable();
        report
    }

    /// Drop decoded data no handle or pending continuation refers to.
    fn release_unreachable(&mut self) -> usize {
        let waiting: HashSet<AssetId> =
            self.joins.iter().flat_map(|j| j.deps.iter().copied()).collect();
        let handles = &mut self.handles;
        let paths = &self.paths;
        let before = self.assets.ready.len();
        self.assets.ready.retain(|id, _| {
            let reachable = waiting.contains(id)
                || handles.get(id).is_some_and(|live| live.strong_count() > 0);
            if !reachable {
                handles.remove(id);
                debug!("releasing {}", paths.get(id).map(String::as_str).unwrap_or("?"));
            }
            reachable
        });
        before - self.assets.ready.len()
    }

    pub fn get<T: AssetType>(&self, handle: &Handle<T>) -> Option<Arc<T>> {
        self.assets.get(handle)
    }

    /// Number of decoded assets currently held.
    pub fn resident(&self) -> usize {
        self.assets.len()
    }

    pub fn status(&self, id: AssetId) -> AssetStatus {
        if self.loaded.contains(&id) {
            AssetStatus::Ready
        } else if self.failed.contains(&id) {
            AssetStatus::Failed
        } else {
            AssetStatus::Loading
        }
    }

    /// Loads started but not yet drained by [`poll`](Self::poll).
    pub fn in_flight(&self) -> usize {
        self.paths.len() - self.loaded.len() - self.failed.len()
    }

    pub fn failed(&self) -> usize {
        self.failed.len()
    }

    pub fn pending_continuations(&self) -> usize {
        self.joins.len()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0 && self.joins.is_empty()
    }
}
