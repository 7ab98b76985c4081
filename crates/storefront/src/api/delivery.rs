//! Delivery location endpoint.

use tracing::instrument;

use super::{ApiClient, ApiError, DeliveryLocation};
use crate::delivery::DeliveryBackend;

impl DeliveryBackend for ApiClient {
    #[instrument(skip(self))]
    async fn delivery_locations(&self) -> Result<Vec<DeliveryLocation>, ApiError> {
        let url = self.endpoint("delivery-locations")?;
        let locations: Option<Vec<DeliveryLocation>> =
            self.send_optional(self.http().get(url)).await?;
        Ok(locations.unwrap_or_default())
    }
}
