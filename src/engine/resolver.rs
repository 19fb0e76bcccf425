use crate::error::ResolutionError;
use crate::model::Employee;
use crate::store::EmployeeDirectory;
use crate::utils::TagCache;
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

/// An employee that passed the active gate. Only the resolver builds these,
/// so the reconciler cannot be handed an inactive employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEmployee(Employee);

impl ActiveEmployee {
    pub fn into_inner(self) -> Employee {
        self.0
    }
}

impl Deref for ActiveEmployee {
    type Target = Employee;

    fn deref(&self) -> &Employee {
        &self.0
    }
}

/// Maps a badge tag to an active employee.
pub struct IdentityResolver {
    directory: Arc<dyn EmployeeDirectory>,
    cache: Option<TagCache>,
}

impl IdentityResolver {
    pub fn new(directory: Arc<dyn EmployeeDirectory>, cache: Option<TagCache>) -> Self {
        Self { directory, cache }
    }

    pub async fn resolve(&self, tag: &str) -> Result<ActiveEmployee, ResolutionError> {
        let mut seen = None;
        if let Some(cache) = &self.cache {
            if let Some(employee) = cache.get(tag).await {
                debug!(employee_id = employee.id, "Tag resolved from cache");
                return Ok(ActiveEmployee(employee));
            }
            seen = Some(cache.generation());
        }

        let employee = self
            .directory
            .lookup_by_tag(tag)
            .await
            .map_err(ResolutionError::Directory)?
            .ok_or_else(|| ResolutionError::UnknownTag(tag.to_string()))?;

        if !employee.active {
            return Err(ResolutionError::InactiveEmployee(employee.id));
        }

        if let (Some(cache), Some(seen)) = (&self.cache, seen) {
            cache.remember(&employee, seen).await;
        }

        Ok(ActiveEmployee(employee))
    }

    /// Must be called by whoever reassigns a tag or flips `active`.
    pub async fn invalidate(&self, tag: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(tag).await;
        }
    }

    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }
}
