// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use kastelaapiclient::{ApiClient, TransportConfig};
use kastelacommon::{
    VERSION_HEADER,
    crypto::{EphemeralKeyPair, FullText, NONCE_LENGTH, PublicKey, SessionCodec},
    endpoint_paths::{
        ENDPOINT_SECURE_CHANNEL, ENDPOINT_SECURE_CHANNEL_BEGIN, secure_begin, secure_fetch,
        secure_store,
    },
    identifiers::{Namespace, SessionId, Token},
    messages::{
        ErrorBody, ServerPublicKey,
        client_channel::{ChannelBeginResponse, InsertParams, InsertResponse},
        client_secure::{
            BeginParams, BeginResponse, FetchParams, FetchResponse, StoreParams, StoreResponse,
        },
    },
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use wiremock::{
    Mock, MockServer, Request, Respond, ResponseTemplate,
    matchers::{method, path, path_regex},
};

/// Version header sent by default.
pub const SERVER_VERSION: &str = "v0.2.0";

/// Misbehavior the simulated server can be told to show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Faults {
    /// Drop the last token of every store response.
    pub truncate_tokens: bool,
    /// Flip one ciphertext bit of every fetched value.
    pub corrupt_values: bool,
    /// Answer every channel commit with an internal error.
    pub fail_commits: bool,
}

/// Simulated tokenization server.
///
/// Stored values are kept as the JSON plaintext the client sealed, so tests
/// can inspect what arrived on the server side.
pub struct TokenizationServer {
    mock_server: MockServer,
    state: Arc<Mutex<State>>,
}

impl TokenizationServer {
    /// Starts a server reporting [`SERVER_VERSION`].
    pub async fn start() -> Self {
        Self::start_with_version(Some(SERVER_VERSION)).await
    }

    /// Starts a server reporting `version`, or no version header at all.
    pub async fn start_with_version(version: Option<&str>) -> Self {
        let mock_server = MockServer::start().await;
        let state = Arc::new(Mutex::new(State::default()));
        let version = version.map(str::to_owned);

        let mut routes = vec![
            (
                ENDPOINT_SECURE_CHANNEL_BEGIN.to_owned(),
                Endpoint::ChannelBegin,
            ),
            (
                format!("^{ENDPOINT_SECURE_CHANNEL}/[^/]+/insert$"),
                Endpoint::ChannelInsert,
            ),
            (
                format!("^{ENDPOINT_SECURE_CHANNEL}/[^/]+/commit$"),
                Endpoint::ChannelCommit,
            ),
        ];
        for namespace in [Namespace::Protection, Namespace::Vault] {
            routes.push((secure_begin(namespace), Endpoint::Begin(namespace)));
            routes.push((secure_store(namespace), Endpoint::Store(namespace)));
            routes.push((secure_fetch(namespace), Endpoint::Fetch(namespace)));
        }

        for (route, endpoint) in routes {
            let handler = Handler {
                state: state.clone(),
                version: version.clone(),
                endpoint,
            };
            let mock = if route.starts_with('^') {
                Mock::given(method("POST")).and(path_regex(route))
            } else {
                Mock::given(method("POST")).and(path(route))
            };
            mock.respond_with(handler).mount(&mock_server).await;
        }

        Self { mock_server, state }
    }

    pub fn uri(&self) -> String {
        self.mock_server.uri()
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::new(self.uri())
    }

    pub fn api_client(&self) -> ApiClient {
        ApiClient::new(&self.transport_config()).expect("Failed to initialize API client")
    }

    pub fn set_faults(&self, faults: Faults) {
        self.state().faults = faults;
    }

    /// Number of store requests received across both namespaces.
    pub fn store_calls(&self) -> usize {
        self.state().store_calls
    }

    /// Number of handshakes performed across all endpoints.
    pub fn handshakes(&self) -> usize {
        self.state().client_public_keys.len()
    }

    /// Client public keys received in handshakes, in arrival order.
    pub fn client_public_keys(&self) -> Vec<PublicKey> {
        self.state().client_public_keys.clone()
    }

    /// Plaintext stored in `namespace` under `token`, decoded as JSON.
    pub fn stored_value(&self, namespace: Namespace, token: &Token) -> Option<serde_json::Value> {
        let state = self.state();
        let plaintext = state.values.get(&(namespace, token.clone()))?;
        serde_json::from_slice(plaintext).ok()
    }

    /// Plaintext committed through a channel session under `token`.
    pub fn committed_value(&self, token: &Token) -> Option<serde_json::Value> {
        let state = self.state();
        let plaintext = state.committed_values.get(token)?;
        serde_json::from_slice(plaintext).ok()
    }

    pub fn is_committed(&self, id: &SessionId) -> bool {
        self.state()
            .channels
            .get(id)
            .is_some_and(|channel| channel.committed)
    }

    /// Channel sessions holding a value that was never committed.
    pub fn pending_sessions(&self) -> Vec<SessionId> {
        let mut pending: Vec<_> = self
            .state()
            .channels
            .iter()
            .filter(|(_, channel)| channel.staged.is_some())
            .map(|(id, _)| id.clone())
            .collect();
        pending.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        pending
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("Server state poisoned")
    }
}

#[derive(Default)]
struct State {
    // Latest handshake per namespace and credential.
    sessions: HashMap<(Namespace, String), SessionCodec>,
    channels: HashMap<SessionId, Channel>,
    values: HashMap<(Namespace, Token), Vec<u8>>,
    // Channel sessions carry no namespace.
    committed_values: HashMap<Token, Vec<u8>>,
    token_counter: u64,
    channel_counter: u64,
    store_calls: usize,
    client_public_keys: Vec<PublicKey>,
    faults: Faults,
}

struct Channel {
    codec: SessionCodec,
    credential: String,
    staged: Option<(Token, Vec<u8>)>,
    committed: bool,
}

fn next_token(counter: &mut u64) -> Token {
    *counter += 1;
    Token::new(format!("tok-{counter}"))
}

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Begin(Namespace),
    Store(Namespace),
    Fetch(Namespace),
    ChannelBegin,
    ChannelInsert,
    ChannelCommit,
}

struct Rejection {
    status: u16,
    error: String,
}

impl Rejection {
    fn new(status: u16, error: &str) -> Self {
        Self {
            status,
            error: error.to_owned(),
        }
    }
}

type HandlerResult = Result<serde_json::Value, Rejection>;

struct Handler {
    state: Arc<Mutex<State>>,
    version: Option<String>,
    endpoint: Endpoint,
}

impl Respond for Handler {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.state.lock().expect("Server state poisoned");
        let result = match self.endpoint {
            Endpoint::Begin(namespace) => begin(&mut state, namespace, request),
            Endpoint::Store(namespace) => store(&mut state, namespace, request),
            Endpoint::Fetch(namespace) => fetch(&state, namespace, request),
            Endpoint::ChannelBegin => channel_begin(&mut state, request),
            Endpoint::ChannelInsert => channel_insert(&mut state, request),
            Endpoint::ChannelCommit => channel_commit(&mut state, request),
        };
        let template = match result {
            Ok(body) => ResponseTemplate::new(200).set_body_json(body),
            Err(Rejection { status, error }) => {
                debug!(endpoint = ?self.endpoint, status, %error, "Rejecting request");
                ResponseTemplate::new(status).set_body_json(ErrorBody { error })
            }
        };
        match &self.version {
            Some(version) => template.insert_header(VERSION_HEADER, version.as_str()),
            None => template,
        }
    }
}

fn parse<T: DeserializeOwned>(request: &Request) -> Result<T, Rejection> {
    request
        .body_json()
        .map_err(|_| Rejection::new(400, "malformed request body"))
}

fn reply<T: Serialize>(body: T) -> HandlerResult {
    serde_json::to_value(body).map_err(|_| Rejection::new(500, "could not encode response"))
}

fn channel_id(request: &Request) -> Result<SessionId, Rejection> {
    // /api/secure-channel/{id}/...
    request
        .url
        .path()
        .split('/')
        .nth(3)
        .map(SessionId::from)
        .ok_or_else(|| Rejection::new(404, "session not found"))
}

fn begin(state: &mut State, namespace: Namespace, request: &Request) -> HandlerResult {
    let params: BeginParams = parse(request)?;
    let key_pair = EphemeralKeyPair::generate();
    let codec = SessionCodec::new(&params.client_public_key, &key_pair);
    state
        .sessions
        .insert((namespace, params.credential.as_str().to_owned()), codec);
    state.client_public_keys.push(params.client_public_key);
    reply(BeginResponse {
        server_public_key: ServerPublicKey::from(key_pair.public_key()),
    })
}

fn store(state: &mut State, namespace: Namespace, request: &Request) -> HandlerResult {
    state.store_calls += 1;
    let params: StoreParams = parse(request)?;
    let codec = state
        .sessions
        .get(&(namespace, params.credential.as_str().to_owned()))
        .ok_or_else(|| Rejection::new(401, "no active session"))?;
    let plaintexts = params
        .values
        .try_map(|full_text| codec.open_bytes(full_text))
        .map_err(|_| Rejection::new(400, "decryption failed"))?;

    let tokens = plaintexts.map(|plaintext| {
        let token = next_token(&mut state.token_counter);
        state.values.insert((namespace, token.clone()), plaintext);
        token
    });
    let tokens = if state.faults.truncate_tokens {
        let mut groups = tokens.into_groups();
        if let Some(last) = groups.last_mut() {
            last.pop();
        }
        groups.into()
    } else {
        tokens
    };
    reply(StoreResponse { tokens })
}

fn fetch(state: &State, namespace: Namespace, request: &Request) -> HandlerResult {
    let params: FetchParams = parse(request)?;
    let codec = state
        .sessions
        .get(&(namespace, params.credential.as_str().to_owned()))
        .ok_or_else(|| Rejection::new(401, "no active session"))?;
    let values = params.tokens.try_map(|token| {
        let plaintext = state
            .values
            .get(&(namespace, token.clone()))
            .ok_or_else(|| Rejection::new(404, "token not found"))?;
        let mut full_text: FullText = codec
            .seal_bytes(plaintext)
            .map_err(|_| Rejection::new(500, "encryption failed"))?;
        if state.faults.corrupt_values {
            full_text.flip_bit(NONCE_LENGTH + 1);
        }
        Ok(full_text.to_base64())
    })?;
    reply(FetchResponse { values })
}

fn channel_begin(state: &mut State, request: &Request) -> HandlerResult {
    let params: BeginParams = parse(request)?;
    let key_pair = EphemeralKeyPair::generate();
    state.channel_counter += 1;
    let id = SessionId::new(format!("s{}", state.channel_counter));
    state.channels.insert(
        id.clone(),
        Channel {
            codec: SessionCodec::new(&params.client_public_key, &key_pair),
            credential: params.credential.as_str().to_owned(),
            staged: None,
            committed: false,
        },
    );
    state.client_public_keys.push(params.client_public_key);
    reply(ChannelBeginResponse {
        id,
        server_public_key: ServerPublicKey::from(key_pair.public_key()),
    })
}

fn channel_insert(state: &mut State, request: &Request) -> HandlerResult {
    let id = channel_id(request)?;
    let params: InsertParams = parse(request)?;
    let channel = state
        .channels
        .get_mut(&id)
        .ok_or_else(|| Rejection::new(404, "session not found"))?;
    if channel.credential != params.credential.as_str() {
        return Err(Rejection::new(401, "credential does not match session"));
    }
    if channel.staged.is_some() || channel.committed {
        return Err(Rejection::new(409, "session already holds a value"));
    }
    let plaintext = channel
        .codec
        .open_bytes(&params.data)
        .map_err(|_| Rejection::new(400, "decryption failed"))?;
    let token = next_token(&mut state.token_counter);
    channel.staged = Some((token.clone(), plaintext));
    reply(InsertResponse { token })
}

fn channel_commit(state: &mut State, request: &Request) -> HandlerResult {
    if state.faults.fail_commits {
        return Err(Rejection::new(500, "commit failed"));
    }
    let id = channel_id(request)?;
    let channel = state
        .channels
        .get_mut(&id)
        .ok_or_else(|| Rejection::new(404, "session not found"))?;
    let (token, plaintext) = channel
        .staged
        .take()
        .ok_or_else(|| Rejection::new(409, "nothing to commit"))?;
    channel.committed = true;
    state.committed_values.insert(token, plaintext);
    reply(serde_json::json!({}))
}
