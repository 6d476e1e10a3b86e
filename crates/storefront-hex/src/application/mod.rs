pub mod cart_service;
pub mod catalog_service;
pub mod messages;
pub mod order_service;

use storefront_types::ports::store::UnitOfWork;

use crate::errors::AppError;

/// Commits the unit of work when `result` is `Ok`, rolls it back otherwise.
pub(crate) async fn finish<T>(
    uow: Box<dyn UnitOfWork>,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = uow.rollback().await {
                tracing::warn!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}
