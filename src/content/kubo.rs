use super::{Block, ContentFetcher, ContentId, FetchError, Link};
use crate::uri_tools::compose_uri;

use async_trait::async_trait;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use hyper::body::{Body, Bytes};
use hyper::client::connect::Connect;
use hyper::client::{Client, HttpConnector};
use hyper::http::uri::Uri;
use hyper::{Method, Request};
use hyper_tls::HttpsConnector;
use lazy_static::lazy_static;
use serde::Deserialize;
use std::time::Duration;

// dag-json bytes are unpadded, accept padding anyway
const DAG_JSON_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

lazy_static! {
    static ref KUBO_API_URL: Uri = "http://127.0.0.1:5001".parse().unwrap();
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DagJsonNode {
    #[serde(default)]
    data: Option<DagJsonBytes>,
    #[serde(default)]
    links: Vec<DagJsonLink>,
}

#[derive(Deserialize)]
struct DagJsonBytes {
    #[serde(rename = "/")]
    slash: DagJsonBytesInner,
}

#[derive(Deserialize)]
struct DagJsonBytesInner {
    bytes: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DagJsonLink {
    hash: DagJsonCid,
    #[serde(default)]
    name: String,
    #[serde(default)]
    tsize: u64,
}

#[derive(Deserialize)]
struct DagJsonCid {
    #[serde(rename = "/")]
    cid: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KuboErrorBody {
    message: String,
}

impl TryFrom<DagJsonNode> for Block {
    type Error = FetchError;

    fn try_from(node: DagJsonNode) -> Result<Self, FetchError> {
        let data = match node.data {
            Some(bytes) => DAG_JSON_BASE64.decode(bytes.slash.bytes)?,
            None => vec![],
        };
        let links = node
            .links
            .into_iter()
            .map(|link| -> Result<Link, FetchError> {
                Ok(Link {
                    cid: link.hash.cid.parse()?,
                    name: link.name,
                    size: link.tsize,
                })
            })
            .collect::<Result<Vec<_>, FetchError>>()?;
        Ok(Block::new(data, links))
    }
}

pub struct KuboFetcher<C = HttpsConnector<HttpConnector>> {
    client: Client<C>,
    api: Uri,
    timeout: Duration,
}

impl KuboFetcher {
    pub fn new(api: Uri, timeout: Duration) -> Self {
        let https = HttpsConnector::new();
        let client = Client::builder().build::<_, Body>(https);
        Self::with_client(client, api, timeout)
    }

    pub fn default_api() -> Uri {
        KUBO_API_URL.clone()
    }

    pub fn default_timeout() -> Duration {
        Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)
    }
}

impl Default for KuboFetcher {
    fn default() -> Self {
        Self::new(Self::default_api(), Self::default_timeout())
    }
}

impl<C> KuboFetcher<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    pub fn with_client(client: Client<C>, api: Uri, timeout: Duration) -> Self {
        Self {
            client,
            api,
            timeout,
        }
    }

    pub fn api(&self) -> &Uri {
        &self.api
    }

    async fn dag_get(&self, cid: &ContentId) -> Result<Bytes, FetchError> {
        let uri = compose_uri(
            &self.api,
            &format!("/api/v0/dag/get?arg={cid}&output-codec=dag-json"),
        )?;
        // Kubo RPC only accepts POST
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())?;
        let response = self.client.request(request).await?;
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<KuboErrorBody>(&body)
                .map(|error| error.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(FetchError::NonSuccess { status, message });
        }
        Ok(body)
    }
}

#[async_trait]
impl<C> ContentFetcher for KuboFetcher<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    async fn fetch(&self, cid: &ContentId) -> Result<Block, FetchError> {
        let body = tokio::time::timeout(self.timeout, self.dag_get(cid))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;
        let node: DagJsonNode = serde_json::from_slice(&body)?;
        node.try_into()
    }
}
