use super::{
    error::ErrorResponse,
    handlers::{health, types, web3},
};
use utoipa::{
    openapi::{Contact, License, Tag},
    OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        web3::challenge_get,
        web3::challenge_post,
        web3::verify,
    ),
    components(schemas(
        health::Health,
        types::ChallengeRequest,
        types::ChallengeResponse,
        types::VerifyRequest,
        types::VerifyResponse,
        types::UserInfo,
        ErrorResponse,
    ))
)]
struct ApiDoc;

/// The document of the unauthenticated endpoints. The WebDAV surface is not described.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = optional_str(env!("CARGO_PKG_DESCRIPTION")).map(str::to_string);
    doc.info.contact = cargo_contact();
    doc.info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(|identifier| {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        license
    });

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Liveness and build information".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Wallet challenge and signature verification".to_string());

    doc.tags = Some(vec![health_tag, auth_tag]);
    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `:` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(':').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match (author.find('<'), author.rfind('>')) {
        (Some(open), Some(close)) if open < close => (
            optional_str(author[..open].trim()),
            optional_str(author[open + 1..close].trim()),
        ),
        _ => (optional_str(author), None),
    }
}

const fn optional_str(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_public_endpoints() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/api/auth/challenge"));
        assert!(doc.paths.paths.contains_key("/api/auth/verify"));
    }

    #[test]
    fn author_parsing() {
        assert_eq!(
            parse_author("Team web3dav <team@web3dav.dev>"),
            (Some("Team web3dav"), Some("team@web3dav.dev"))
        );
        assert_eq!(parse_author("solo"), (Some("solo"), None));
    }
}
