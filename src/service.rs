use crate::config::Config;
use crate::content::{ContentFetcher, IpfsFetcher};
use crate::error::LookupError;
use crate::geoip::GeoIp;
use crate::header_tools::ClientIpHeaders;

use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Body, HeaderMap, Method, Request, Response, StatusCode};
use std::net::IpAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Method {0} is not allowed, use GET")]
    MethodNotAllowed(Method),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("Cannot serialize record: {0}")]
    Json(#[from] serde_json::Error),
    #[error(r#"Internal server error: "{0:?}""#)]
    InternalServerError(#[from] hyper::http::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Lookup(LookupError::Address(_)) => StatusCode::BAD_REQUEST,
            Self::Lookup(LookupError::UnmappedRange { .. }) => StatusCode::NOT_FOUND,
            Self::Lookup(LookupError::Fetch { .. }) => StatusCode::BAD_GATEWAY,
            Self::Lookup(LookupError::Decode { .. } | LookupError::LookupFailed { .. })
            | Self::Json(_)
            | Self::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub struct GeoIpService<F = IpfsFetcher> {
    client_ip_headers: ClientIpHeaders,
    response_headers: HeaderMap,
    geoip: GeoIp<F>,
}

impl GeoIpService {
    pub fn from_config(config: Config) -> Self {
        let Config {
            ip_headers,
            ip_headers_recursive,
            response_headers,
            root,
            ipfs,
            ..
        } = config;

        let fetcher = ipfs.fetcher();
        log::info!(
            "fetching blocks from {} with {}s timeout",
            fetcher,
            ipfs.timeout.get()
        );
        let geoip = match root {
            Some(root) => GeoIp::with_root(fetcher, root),
            None => GeoIp::new(fetcher),
        };
        log::info!("serving dataset {}", geoip.root());

        Self::new(
            geoip,
            ClientIpHeaders::new(ip_headers, ip_headers_recursive),
            response_headers,
        )
    }
}

impl<F> GeoIpService<F>
where
    F: ContentFetcher,
{
    pub fn new(
        geoip: GeoIp<F>,
        client_ip_headers: ClientIpHeaders,
        response_headers: HeaderMap,
    ) -> Self {
        Self {
            client_ip_headers,
            response_headers,
            geoip,
        }
    }

    pub fn geoip(&self) -> &GeoIp<F> {
        &self.geoip
    }

    pub async fn response(
        &self,
        socket_ip_addr: IpAddr,
        request: &Request<Body>,
    ) -> Result<Response<Body>, ServiceError> {
        if request.method() != Method::GET {
            return Err(ServiceError::MethodNotAllowed(request.method().clone()));
        }

        let path = request.uri().path();
        let record = match path.strip_prefix('/').unwrap_or(path) {
            "" => {
                let remote_ip = self
                    .client_ip_headers
                    .resolve(request.headers(), socket_ip_addr);
                self.geoip.lookup_ip(remote_ip).await?
            }
            address if address.starts_with("ip4/") => self.geoip.lookup(path).await?,
            address => self.geoip.lookup(address).await?,
        };

        let body = serde_json::to_vec(&record)?;
        let mut response_builder = Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/json");
        if let Some(headers) = response_builder.headers_mut() {
            for (name, value) in &self.response_headers {
                headers.insert(name, value.clone());
            }
        }
        Ok(response_builder.body(body.into())?)
    }
}

pub fn make_error_response(error: ServiceError) -> Response<Body> {
    let status = error.status();
    let mut response = Response::new(Body::from(error.to_string()));
    *response.status_mut() = status;
    if let ServiceError::MethodNotAllowed(_) = error {
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("GET"));
    }
    response
}

pub fn log_response(socket_ip_addr: IpAddr, request: &Request<Body>, response: &Response<Body>) {
    log::info!(
        "{} {} {} {}",
        socket_ip_addr,
        request.method(),
        request.uri(),
        response.status(),
    );
}
