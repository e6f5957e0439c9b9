use rand::Rng;
use std::borrow::Cow;
use std::net::{Ipv4Addr, Ipv6Addr};
use stressapi_common::{ConfigError, Result};

const MARKER: &str = "%%";

/// Public IPv4 space handed out by `randomipv4`: 1.0.0.0 to 223.255.255.255.
const PUBLIC_IPV4: (u32, u32) = (0x0100_0000, 0xDFFF_FFFF);

/// 10.0.0.0/8, 172.16.0.0/12 and 192.168.0.0/16.
const PRIVATE_IPV4: [(u32, u32); 3] = [
    (0x0A00_0000, 0x0AFF_FFFF),
    (0xAC10_0000, 0xAC1F_FFFF),
    (0xC0A8_0000, 0xC0A8_FFFF),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    RandomIpv4,
    RandomIpv6,
    RandomPrivateIpv4,
    RandomInt { min: i64, max: i64 },
}

impl Token {
    fn parse(name: &str) -> Result<Self> {
        let invalid = || ConfigError::InvalidUrlTemplate(name.to_string());
        match name.to_ascii_lowercase().as_str() {
            "randomipv4" => Ok(Token::RandomIpv4),
            "randomipv6" => Ok(Token::RandomIpv6),
            "randomprivateipv4" => Ok(Token::RandomPrivateIpv4),
            other => {
                let bounds = other.strip_prefix("randomint:").ok_or_else(invalid)?;
                let (min, max) = bounds.split_once(':').ok_or_else(invalid)?;
                let min: i64 = min.trim().parse().map_err(|_| invalid())?;
                let max: i64 = max.trim().parse().map_err(|_| invalid())?;
                if min > max {
                    return Err(invalid());
                }
                Ok(Token::RandomInt { min, max })
            }
        }
    }

    fn generate(&self, rng: &mut impl Rng) -> String {
        match *self {
            Token::RandomIpv4 => {
                Ipv4Addr::from(rng.gen_range(PUBLIC_IPV4.0..=PUBLIC_IPV4.1)).to_string()
            }
            Token::RandomIpv6 => Ipv6Addr::from(rng.gen::<u128>()).to_string(),
            Token::RandomPrivateIpv4 => {
                let (low, high) = PRIVATE_IPV4[rng.gen_range(0..PRIVATE_IPV4.len())];
                Ipv4Addr::from(rng.gen_range(low..=high)).to_string()
            }
            Token::RandomInt { min, max } => rng.gen_range(min..=max).to_string(),
        }
    }

    /// A fixed value of the right shape, used to validate the surrounding URL.
    fn example(&self) -> String {
        match *self {
            Token::RandomIpv4 | Token::RandomPrivateIpv4 => "10.0.0.1".to_string(),
            Token::RandomIpv6 => "::1".to_string(),
            Token::RandomInt { min, .. } => min.to_string(),
        }
    }
}

/// A target URL with at most one `%%token%%` segment, parsed once per worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    prefix: String,
    dynamic: Option<Dynamic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Dynamic {
    raw: String,
    token: Token,
    suffix: String,
}

impl UrlTemplate {
    pub fn parse(url: &str) -> Result<Self> {
        let Some(open) = url.find(MARKER) else {
            return Ok(Self { prefix: url.to_string(), dynamic: None });
        };
        let after_open = &url[open + MARKER.len()..];
        let close = after_open
            .find(MARKER)
            .ok_or_else(|| ConfigError::InvalidUrlTemplate(url[open..].to_string()))?;
        let name = &after_open[..close];
        let suffix = &after_open[close + MARKER.len()..];
        if suffix.contains(MARKER) {
            return Err(ConfigError::InvalidUrlTemplate(suffix.to_string()));
        }

        Ok(Self {
            prefix: url[..open].to_string(),
            dynamic: Some(Dynamic {
                raw: format!("{MARKER}{name}{MARKER}"),
                token: Token::parse(name)?,
                suffix: suffix.to_string(),
            }),
        })
    }

    pub fn is_static(&self) -> bool {
        self.dynamic.is_none()
    }

    /// The raw token including its markers, e.g. `%%randomint:1:1000%%`.
    pub fn token(&self) -> Option<&str> {
        self.dynamic.as_ref().map(|d| d.raw.as_str())
    }

    pub fn kind(&self) -> Option<Token> {
        self.dynamic.as_ref().map(|d| d.token)
    }

    pub fn render(&self, rng: &mut impl Rng) -> Cow<'_, str> {
        match &self.dynamic {
            None => Cow::Borrowed(&self.prefix),
            Some(d) => Cow::Owned(format!("{}{}{}", self.prefix, d.token.generate(rng), d.suffix)),
        }
    }

    pub fn example(&self) -> Cow<'_, str> {
        match &self.dynamic {
            None => Cow::Borrowed(&self.prefix),
            Some(d) => Cow::Owned(format!("{}{}{}", self.prefix, d.token.example(), d.suffix)),
        }
    }
}
