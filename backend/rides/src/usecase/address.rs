use crate::usecase::contracts::AddressResolver;
use crate::usecase::error::UsecaseError;

pub const MIN_DESCRIPTION_CHARS: usize = 5;

const TOO_SHORT: &str = "Please provide a more detailed description (at least 5 characters).";
const NOT_RESOLVED: &str =
    "Our AI assistant could not determine the address. Please try a different description.";

pub struct AddressUseCase<A>
where
    A: AddressResolver,
{
    resolver: Option<A>,
}

impl<A> AddressUseCase<A>
where
    A: AddressResolver,
{
    /// Without a resolver every call answers `Unavailable`.
    pub fn new(resolver: Option<A>) -> Self {
        Self { resolver }
    }

    #[tracing::instrument(skip(self, description), fields(description_len = description.len()))]
    pub async fn resolve(&self, description: &str) -> Result<String, UsecaseError> {
        let description = description.trim();
        if description.chars().count() < MIN_DESCRIPTION_CHARS {
            return Err(UsecaseError::Validation(TOO_SHORT.to_string()));
        }

        let Some(resolver) = &self.resolver else {
            tracing::warn!("address resolution requested but no resolver is configured");
            return Err(UsecaseError::Unavailable(
                "Address suggestions are not available right now.".to_string(),
            ));
        };

        match resolver.resolve_address(description).await {
            Ok(address) if !address.trim().is_empty() => {
                tracing::info!("address resolved");
                Ok(address.trim().to_string())
            }
            Ok(_) => {
                tracing::warn!("resolver returned an empty address");
                Err(UsecaseError::ExternalService(NOT_RESOLVED.to_string()))
            }
            Err(e) => {
                tracing::error!(error = %e, "address resolution failed");
                Err(UsecaseError::ExternalService(NOT_RESOLVED.to_string()))
            }
        }
    }
}
