mod bid_api;
mod booking_api;
mod helpers;

use oso::Oso;
use sqlx::{Executor, Pool, Postgres};

use crate::{
    api::API,
    auth::authorizor,
    error::{forbidden_error, Error},
};

type Database = Postgres;

pub struct Engine {
    pool: Pool<Database>,
    authorizor: Oso,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub async fn new(pool: Pool<Database>) -> Result<Self, Error> {
        pool.execute(
            "CREATE TABLE IF NOT EXISTS bookings (\
             id BIGSERIAL PRIMARY KEY, \
             uuid UUID UNIQUE NOT NULL, \
             status VARCHAR NOT NULL, \
             shipper_org_id UUID NOT NULL, \
             data JSONB NOT NULL)",
        )
        .await?;

        pool.execute("CREATE INDEX IF NOT EXISTS bookings_status_idx ON bookings (status)")
            .await?;
        pool.execute(
            "CREATE INDEX IF NOT EXISTS bookings_shipper_org_idx ON bookings (shipper_org_id)",
        )
        .await?;

        pool.execute(
            "CREATE TABLE IF NOT EXISTS bids (\
             id BIGSERIAL PRIMARY KEY, \
             booking_id BIGINT NOT NULL, \
             carrier_user_id UUID NOT NULL, \
             carrier_org_id UUID NOT NULL, \
             total_price NUMERIC NOT NULL, \
             platform_charge NUMERIC NOT NULL, \
             carrier_net_amount NUMERIC NOT NULL, \
             platform_charge_percentage NUMERIC NOT NULL, \
             message TEXT, \
             status VARCHAR NOT NULL, \
             valid_until TIMESTAMPTZ NOT NULL, \
             created_at TIMESTAMPTZ NOT NULL, \
             updated_at TIMESTAMPTZ NOT NULL, \
             responded_at TIMESTAMPTZ, \
             CONSTRAINT fk_bid_booking FOREIGN KEY(booking_id) REFERENCES bookings(id))",
        )
        .await?;

        pool.execute(
            "CREATE INDEX IF NOT EXISTS bids_booking_status_idx ON bids (booking_id, status)",
        )
        .await?;

        // one live tender per organization per booking
        pool.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS bids_active_org_idx ON bids (booking_id, carrier_org_id) WHERE status = 'pending'",
        )
        .await?;

        Ok(Self {
            pool,
            authorizor: authorizor::new(),
        })
    }
}

impl Engine {
    pub fn authorize<Actor, Action, Resource>(
        &self,
        actor: Actor,
        action: Action,
        resource: Resource,
    ) -> Result<(), Error>
    where
        Actor: oso::ToPolar,
        Action: oso::ToPolar,
        Resource: oso::ToPolar,
    {
        if self.authorizor.is_allowed(actor, action, resource)? {
            return Ok(());
        }

        Err(forbidden_error())
    }
}

impl API for Engine {}
