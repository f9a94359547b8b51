use axum::extract::{Extension, Json, Path};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{BidAction, BidOutcome, BidParams, DynAPI};
use crate::auth::Principal;
use crate::entities::Bid;
use crate::error::Error;

pub async fn submit(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
    Path(uuid): Path<Uuid>,
    Json(params): Json<BidParams>,
) -> Result<Json<Bid>, Error> {
    let bid = api.submit_bid(principal, uuid, params).await?;

    Ok(bid.into())
}

pub async fn list(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
    Path(uuid): Path<Uuid>,
) -> Result<Json<Vec<Bid>>, Error> {
    let bids = api.list_bids(principal, uuid).await?;

    Ok(bids.into())
}

pub async fn accept(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
    Path((uuid, bid_id)): Path<(Uuid, i64)>,
) -> Result<Json<BidOutcome>, Error> {
    let outcome = api
        .respond_to_bid(principal, uuid, bid_id, BidAction::Accept)
        .await?;

    Ok(outcome.into())
}

pub async fn reject(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
    Path((uuid, bid_id)): Path<(Uuid, i64)>,
) -> Result<Json<BidOutcome>, Error> {
    let outcome = api
        .respond_to_bid(principal, uuid, bid_id, BidAction::Reject)
        .await?;

    Ok(outcome.into())
}

pub async fn withdraw(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
    Path((uuid, bid_id)): Path<(Uuid, i64)>,
) -> Result<Json<Bid>, Error> {
    let bid = api.withdraw_bid(principal, uuid, bid_id).await?;

    Ok(bid.into())
}

pub async fn expire(
    Extension(api): Extension<DynAPI>,
    principal: Principal,
) -> Result<Json<Value>, Error> {
    let expired = api.expire_stale_bids(principal).await?;

    Ok(Json(json!({ "expired": expired })))
}
