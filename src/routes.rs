use crate::{
    api::{self, attendance},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use anyhow::{Result, anyhow};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-peer-IP rate limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    ingest: Limiter,
    query: Limiter,
}

impl Limiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            ingest: build_limiter(config.rate_ingest_per_min)?,
            query: build_limiter(config.rate_query_per_min)?,
        })
    }
}

fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {requests_per_min} per minute"))?;

    Ok(Arc::new(Governor::new(&cfg)))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    cfg.service(web::resource("/health").route(web::get().to(api::health)))
        .service(web::resource("/api-doc/openapi.json").route(web::get().to(api::openapi_json)));

    cfg.service(
        web::scope(&config.api_prefix)
            // /attendance/events
            .service(
                web::resource("/attendance/events")
                    .wrap(limiters.ingest.clone())
                    .route(web::post().to(attendance::ingest_event)),
            )
            // /attendance/employee/{employee_id}[?date= | ?start_date=&end_date=]
            .service(
                web::resource("/attendance/employee/{employee_id}")
                    .wrap(limiters.query.clone())
                    .route(web::get().to(attendance::employee_spans)),
            )
            // /attendance/spans/{span_id}
            .service(
                web::resource("/attendance/spans/{span_id}")
                    .wrap(limiters.query.clone())
                    .route(web::get().to(attendance::span_by_id)),
            )
            // /reports/daily/{date}
            .service(
                web::resource("/reports/daily/{date}")
                    .wrap(limiters.query.clone())
                    .route(web::get().to(attendance::daily_report)),
            ),
    );
}

// DEVICE
//  └─ POST /attendance/events {deviceId, rfidTag, kind, occurredAt}
//       ├─ CHECK_IN  → 201 span opened
//       └─ CHECK_OUT → 200 span closed

// REPORTING
//  ├─ GET /attendance/employee/{id}?date=YYYY-MM-DD
//  ├─ GET /attendance/employee/{id}?start_date=..&end_date=..
//  ├─ GET /attendance/employee/{id}            (full history)
//  ├─ GET /attendance/spans/{span_id}
//  └─ GET /reports/daily/{date}
