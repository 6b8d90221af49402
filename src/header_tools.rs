use hyper::HeaderMap;
use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct ClientIpHeaders {
    names: Vec<String>,
    recursive: bool,
}

impl ClientIpHeaders {
    pub fn new(names: Vec<String>, recursive: bool) -> Self {
        Self { names, recursive }
    }

    pub fn client_ip(&self, headers: &HeaderMap) -> Option<IpAddr> {
        let value = self.names.iter().find_map(|name| {
            let mut values = headers.get_all(name.as_str()).iter();
            if self.recursive {
                values.next()
            } else {
                values.next_back()
            }
        })?;
        let value = value.to_str().ok()?;
        let mut addresses = value.split(',');
        let address = if self.recursive {
            addresses.next()
        } else {
            addresses.next_back()
        }?;
        address.trim().parse().ok()
    }

    pub fn resolve(&self, headers: &HeaderMap, socket_ip: IpAddr) -> IpAddr {
        self.client_ip(headers)
            .unwrap_or(socket_ip)
            .to_canonical()
    }
}
