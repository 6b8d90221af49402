use super::{
    dag_pb, Block, ContentFetcher, ContentId, FetchError, KuboFetcher, DAG_PB_CODEC, RAW_CODEC,
    SHA2_256,
};
use crate::uri_tools::compose_uri;

use async_trait::async_trait;
use hyper::body::{Body, Bytes};
use hyper::client::connect::Connect;
use hyper::client::{Client, HttpConnector};
use hyper::header::{HeaderValue, ACCEPT};
use hyper::http::uri::Uri;
use hyper::{Method, Request};
use hyper_tls::HttpsConnector;
use lazy_static::lazy_static;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;

const RAW_BLOCK_MIME: &str = "application/vnd.ipld.raw";

lazy_static! {
    static ref GATEWAY_URL: Uri = "https://ipfs.io".parse().unwrap();
}

pub struct GatewayFetcher<C = HttpsConnector<HttpConnector>> {
    client: Client<C>,
    gateway: Uri,
    timeout: Duration,
}

impl GatewayFetcher {
    pub fn new(gateway: Uri, timeout: Duration) -> Self {
        let https = HttpsConnector::new();
        let client = Client::builder().build::<_, Body>(https);
        Self::with_client(client, gateway, timeout)
    }

    pub fn default_gateway() -> Uri {
        GATEWAY_URL.clone()
    }
}

impl Default for GatewayFetcher {
    fn default() -> Self {
        Self::new(Self::default_gateway(), KuboFetcher::default_timeout())
    }
}

impl<C> GatewayFetcher<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    pub fn with_client(client: Client<C>, gateway: Uri, timeout: Duration) -> Self {
        Self {
            client,
            gateway,
            timeout,
        }
    }

    pub fn gateway(&self) -> &Uri {
        &self.gateway
    }

    async fn raw_block(&self, cid: &ContentId) -> Result<Bytes, FetchError> {
        let uri = compose_uri(&self.gateway, &format!("/ipfs/{cid}?format=raw"))?;
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(ACCEPT, HeaderValue::from_static(RAW_BLOCK_MIME))
            .body(Body::empty())?;
        let response = self.client.request(request).await?;
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await?;
        if !status.is_success() {
            let message = String::from_utf8_lossy(&body).trim().to_owned();
            return Err(FetchError::NonSuccess { status, message });
        }
        Ok(body)
    }
}

// Only SHA2-256 digests are checked, other hash functions are taken on trust
fn verify(cid: &ContentId, bytes: &[u8]) -> Result<(), FetchError> {
    let hash = cid.as_cid().hash();
    if hash.code() == SHA2_256 && Sha256::digest(bytes).as_slice() != hash.digest() {
        return Err(FetchError::Digest(cid.clone()));
    }
    Ok(())
}

fn decode_block(cid: &ContentId, bytes: Bytes) -> Result<Block, FetchError> {
    verify(cid, &bytes)?;
    match cid.as_cid().codec() {
        DAG_PB_CODEC => Ok(dag_pb::decode(&bytes)?),
        RAW_CODEC => Ok(Block::new(bytes, vec![])),
        codec => Err(FetchError::Codec(codec)),
    }
}

#[async_trait]
impl<C> ContentFetcher for GatewayFetcher<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    async fn fetch(&self, cid: &ContentId) -> Result<Block, FetchError> {
        let bytes = tokio::time::timeout(self.timeout, self.raw_block(cid))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;
        decode_block(cid, bytes)
    }
}

pub enum IpfsFetcher {
    Kubo(KuboFetcher),
    Gateway(GatewayFetcher),
}

impl fmt::Display for IpfsFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kubo(kubo) => write!(f, "Kubo RPC API {}", kubo.api()),
            Self::Gateway(gateway) => write!(f, "gateway {}", gateway.gateway()),
        }
    }
}

#[async_trait]
impl ContentFetcher for IpfsFetcher {
    async fn fetch(&self, cid: &ContentId) -> Result<Block, FetchError> {
        match self {
            Self::Kubo(kubo) => kubo.fetch(cid).await,
            Self::Gateway(gateway) => gateway.fetch(cid).await,
        }
    }
}
