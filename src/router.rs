use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info_span, Instrument};

use crate::backend::MediaBackend;
use crate::channel::{Channel, MethodCall, Reply};
use crate::encoder::{encode_flag, encode_names};
use crate::error::{BackendResult, BridgeError};
use crate::state::data::ImageRef;

/// The logical commands understood on the channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetFavorite,
    IsFavorite,
    AddToAlbum,
    GetAlbums,
    CreateAlbum,
}

impl Command {
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "setFavorite" => Some(Self::SetFavorite),
            "isFavorite" => Some(Self::IsFavorite),
            "addToAlbum" => Some(Self::AddToAlbum),
            "getAlbums" => Some(Self::GetAlbums),
            "createAlbum" => Some(Self::CreateAlbum),
            _ => None,
        }
    }

    pub fn method(self) -> &'static str {
        match self {
            Self::SetFavorite => "setFavorite",
            Self::IsFavorite => "isFavorite",
            Self::AddToAlbum => "addToAlbum",
            Self::GetAlbums => "getAlbums",
            Self::CreateAlbum => "createAlbum",
        }
    }

    /// Channel that carries this command
    pub fn channel(self) -> Channel {
        match self {
            Self::SetFavorite | Self::IsFavorite => Channel::Favorite,
            Self::AddToAlbum | Self::GetAlbums | Self::CreateAlbum => Channel::Albums,
        }
    }
}

/// Typed access to a call's argument bundle.
struct Args<'a>(Option<&'a Map<String, Value>>);

impl<'a> Args<'a> {
    fn new(args: &'a Value) -> Self {
        Self(args.as_object())
    }

    fn get(&self, name: &'static str) -> BackendResult<&'a Value> {
        self.0
            .and_then(|map| map.get(name))
            .filter(|value| !value.is_null())
            .ok_or(BridgeError::MissingArgument(name))
    }

    fn string(&self, name: &'static str) -> BackendResult<&'a str> {
        self.get(name)?
            .as_str()
            .ok_or(BridgeError::MalformedArgument {
                name,
                expected: "string",
            })
    }

    fn flag(&self, name: &'static str) -> BackendResult<bool> {
        self.get(name)?
            .as_bool()
            .ok_or(BridgeError::MalformedArgument {
                name,
                expected: "bool",
            })
    }
}

/// Dispatches channel calls to a [`MediaBackend`] and encodes the result.
///
/// Argument checks happen before the backend is touched; a bad bundle never
/// reaches it.
#[derive(Clone)]
pub struct CommandRouter {
    backend: Arc<dyn MediaBackend>,
}

impl CommandRouter {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self { backend }
    }

    pub async fn handle(&self, call: &MethodCall) -> Reply {
        let Some(command) = Command::parse(&call.method) else {
            debug!(method = %call.method, "unknown method");
            return Reply::NotImplemented;
        };

        if let Some(name) = call.channel.as_deref() {
            if Channel::from_name(name) != Some(command.channel()) {
                debug!(
                    method = %call.method,
                    channel = name,
                    expected = command.channel().name(),
                    "method not carried on channel"
                );
                return Reply::NotImplemented;
            }
        }

        let span = info_span!("command", method = command.method(), backend = self.backend.name());
        self.dispatch(command, Args::new(&call.args))
            .instrument(span)
            .await
    }

    async fn dispatch(&self, command: Command, args: Args<'_>) -> Reply {
        let method = command.method();
        match command {
            Command::SetFavorite => encode_flag(method, self.set_favorite(&args).await),
            Command::IsFavorite => encode_flag(method, self.is_favorite(&args).await),
            Command::AddToAlbum => encode_flag(method, self.add_to_album(&args).await),
            Command::GetAlbums => encode_names(method, self.backend.get_albums().await),
            Command::CreateAlbum => encode_flag(method, self.create_album(&args).await),
        }
    }

    fn check_favorites(&self) -> BackendResult<()> {
        if !self.backend.supports_favorites() {
            return Err(BridgeError::CapabilityUnavailable {
                feature: "favorite flag",
            });
        }
        Ok(())
    }

    async fn set_favorite(&self, args: &Args<'_>) -> BackendResult<bool> {
        self.check_favorites()?;
        let image = ImageRef::new(args.string("id")?);
        let favorite = args.flag("favorite")?;
        debug!(%image, favorite, "setFavorite");
        self.backend.set_favorite(&image, favorite).await
    }

    async fn is_favorite(&self, args: &Args<'_>) -> BackendResult<bool> {
        self.check_favorites()?;
        let image = ImageRef::new(args.string("id")?);
        self.backend.is_favorite(&image).await
    }

    async fn add_to_album(&self, args: &Args<'_>) -> BackendResult<bool> {
        let image = ImageRef::new(args.string("id")?);
        let album = args.string("album")?;
        debug!(%image, album, "addToAlbum");
        self.backend.add_to_album(&image, album).await
    }

    async fn create_album(&self, args: &Args<'_>) -> BackendResult<bool> {
        let album = args.string("album")?;
        self.backend.create_album(album).await
    }
}

impl std::fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRouter")
            .field("backend", &self.backend.name())
            .finish()
    }
}
