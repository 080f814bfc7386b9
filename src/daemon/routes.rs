use axum::Json;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::{config, db, referral, registry, slug};

fn error_response(e: anyhow::Error, context: &str) -> Response {
    let status = if e.downcast_ref::<slug::Error>().is_some()
        || matches!(
            e.downcast_ref::<referral::Error>(),
            Some(referral::Error::ZeroLength)
        ) {
        StatusCode::BAD_REQUEST
    } else if db::is_unique_violation(&e, "members.identifier") {
        StatusCode::CONFLICT
    } else if e.downcast_ref::<db::NotFound>().is_some() {
        StatusCode::NOT_FOUND
    } else {
        tracing::error!(error = %e, "{context}");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let msg = if status == StatusCode::CONFLICT {
        "identifier already registered".to_string()
    } else {
        e.to_string()
    };
    (status, Json(json!({"error": msg}))).into_response()
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

pub async fn list_members() -> Response {
    match db::list_members() {
        Ok(members) => (StatusCode::OK, Json(json!(members))).into_response(),
        Err(e) => error_response(e, "failed to list members"),
    }
}

#[derive(serde::Deserialize)]
pub struct RegisterMemberRequest {
    pub identifier: String,
    pub display_name: String,
}

pub async fn register_member(Json(body): Json<RegisterMemberRequest>) -> Response {
    let result = match config::load() {
        Ok(config) => registry::register(&config, &body.identifier, &body.display_name).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(member) => (StatusCode::CREATED, Json(json!(member))).into_response(),
        Err(e) => error_response(e, "failed to register member"),
    }
}

pub async fn get_member(Path(domain): Path<String>) -> Response {
    match db::get_member(&domain) {
        Ok(member) => (StatusCode::OK, Json(json!(member))).into_response(),
        Err(e) => error_response(e, "failed to get member"),
    }
}

pub async fn delete_member(Path(domain): Path<String>) -> Response {
    match db::delete_member(&domain) {
        Ok(()) => {
            tracing::debug!(domain = %domain, "member removed");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e, "failed to remove member"),
    }
}

pub async fn check_domain(Path(name): Path<String>) -> Response {
    let name = name.to_lowercase();
    let status = if slug::is_reserved(&name) {
        "reserved"
    } else {
        match db::domain_exists(&name) {
            Ok(true) => "taken",
            Ok(false) => "available",
            Err(e) => return error_response(e, "failed to check domain"),
        }
    };

    (StatusCode::OK, Json(json!({"name": name, "status": status}))).into_response()
}

#[derive(serde::Deserialize)]
pub struct AllocateDomainRequest {
    pub base: String,
    pub max_tries: Option<usize>,
}

pub async fn allocate_domain(Json(body): Json<AllocateDomainRequest>) -> Response {
    let max_tries = match body.max_tries {
        Some(n) => n,
        None => match config::load() {
            Ok(config) => config.domain_max_tries(),
            Err(e) => return error_response(e, "failed to load config"),
        },
    };

    let result = slug::allocate(
        &body.base,
        |probe| async move { db::domain_exists(&probe) },
        max_tries,
    )
    .await;

    match result {
        Ok(domain_name) => {
            tracing::debug!(base = %body.base, domain = %domain_name, "domain allocated");
            (StatusCode::OK, Json(json!({"domain_name": domain_name}))).into_response()
        }
        Err(e) => error_response(e, "failed to allocate domain"),
    }
}

#[derive(Default, serde::Deserialize)]
pub struct ReferralCodeQuery {
    pub length: Option<usize>,
}

pub async fn referral_code(
    Path(identifier): Path<String>,
    Query(query): Query<ReferralCodeQuery>,
) -> Response {
    let result = config::load().and_then(|config| {
        let secret = config.referral_secret()?;
        let length = query.length.unwrap_or_else(|| config.referral_length());
        Ok(referral::generate_referral_code(
            &identifier,
            secret.expose(),
            length,
        )?)
    });

    match result {
        Ok(code) => (
            StatusCode::OK,
            Json(json!({"identifier": identifier, "referral_code": code})),
        )
            .into_response(),
        Err(e) => error_response(e, "failed to generate referral code"),
    }
}

pub async fn reset_database() -> Response {
    match db::reset() {
        Ok(()) => {
            tracing::debug!("database reset");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e, "failed to reset database"),
    }
}
