//! Credential exchange against the OAuth2 token endpoint.
//!
//! The exchange builds on the `oauth2` crate's [`BasicClient`] with client credentials sent in
//! the form body. Failures are classified by the HTTP status captured in the transport's
//! [`ResponseMetadataSlot`]: 401 and 400 get dedicated codes, every other non-success status
//! maps to [`ErrorCode::AuthFailed`], and anything without a status (network failures,
//! malformed success bodies) maps to [`ErrorCode::AuthUnexpectedError`].

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError, RefreshToken,
	RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{OAuth2Token, TokenSecret},
	clock::Clock,
	config::ClientConfig,
	http::{self, ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Grant used for a token exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrantKind {
	/// `grant_type=client_credentials`.
	ClientCredentials,
	/// `grant_type=refresh_token`.
	RefreshToken,
}
impl GrantKind {
	/// Returns the wire value of the grant.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantKind::ClientCredentials => "client_credentials",
			GrantKind::RefreshToken => "refresh_token",
		}
	}
}
impl Display for GrantKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Performs credential exchanges against the configured token endpoint.
#[derive(Clone)]
pub struct TokenExchange {
	oauth_client: ConfiguredBasicClient,
	http_client: ReqwestHttpClient,
	scopes: Vec<String>,
	clock: Arc<dyn Clock>,
}
impl TokenExchange {
	/// Creates an exchange for the credentials and token endpoint in `config`.
	pub fn new(config: &ClientConfig, http_client: ReqwestHttpClient, clock: Arc<dyn Clock>) -> Self {
		let oauth_client = BasicClient::new(ClientId::new(config.client_id.clone()))
			.set_client_secret(ClientSecret::new(config.client_secret.expose().to_owned()))
			.set_token_uri(TokenUrl::from_url(config.endpoints.auth.clone()))
			.set_auth_type(AuthType::RequestBody);
		let scopes = config.scope.split_whitespace().map(str::to_owned).collect();

		Self { oauth_client, http_client, scopes, clock }
	}

	/// Runs the client-credentials grant.
	pub async fn client_credentials(&self) -> Result<OAuth2Token> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let mut request = self.oauth_client.exchange_client_credentials();

		for scope in &self.scopes {
			request = request.add_scope(Scope::new(scope.clone()));
		}

		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|err| classify(GrantKind::ClientCredentials, meta.take(), err))?;

		self.map_token_response(response)
	}

	/// Runs the refresh-token grant.
	pub async fn refresh(&self, refresh_token: &TokenSecret) -> Result<OAuth2Token> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let refresh_secret = RefreshToken::new(refresh_token.expose().to_owned());
		let response = self
			.oauth_client
			.exchange_refresh_token(&refresh_secret)
			.request_async(&instrumented)
			.await
			.map_err(|err| classify(GrantKind::RefreshToken, meta.take(), err))?;

		self.map_token_response(response)
	}

	fn map_token_response(&self, response: BasicTokenResponse) -> Result<OAuth2Token> {
		let expires_in = response
			.expires_in()
			.ok_or_else(|| {
				Error::new(
					ErrorCode::AuthUnexpectedError,
					"Token endpoint response is missing expires_in.",
				)
			})?
			.as_secs();

		if expires_in == 0 {
			return Err(Error::new(
				ErrorCode::AuthUnexpectedError,
				"The expires_in value must be positive.",
			));
		}

		Ok(OAuth2Token {
			access_token: TokenSecret::new(response.access_token().secret().to_owned()),
			token_type: response.token_type().as_ref().to_owned(),
			expires_in,
			refresh_token: response
				.refresh_token()
				.map(|secret| TokenSecret::new(secret.secret().to_owned())),
			created_at: self.clock.now(),
		})
	}
}
impl Debug for TokenExchange {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchange").field("scopes", &self.scopes).finish()
	}
}

/// Maps an `oauth2` failure onto the auth error codes using the captured HTTP status.
fn classify(
	grant: GrantKind,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let status = meta.and_then(|meta| meta.status);
	let details = match &err {
		RequestTokenError::ServerResponse(response) => serde_json::to_value(response).ok(),
		RequestTokenError::Parse(_, body) => http::body_details(body),
		_ => None,
	};
	let error = match status {
		Some(status) if !(200..300).contains(&status) => {
			let code = match status {
				401 => ErrorCode::AuthInvalidCredentials,
				400 => ErrorCode::AuthInvalidRequest,
				_ => ErrorCode::AuthFailed,
			};

			Error::new(code, format!("Token endpoint rejected the {grant} grant with status {status}."))
				.with_status(status)
		},
		_ => Error::new(
			ErrorCode::AuthUnexpectedError,
			format!("Token exchange for the {grant} grant failed unexpectedly: {err}."),
		),
	};

	match details {
		Some(details) => error.with_details(details),
		None => error,
	}
}
