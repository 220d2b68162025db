use anyhow::{anyhow, Result};
use cadence_core::error::CoreError;
use cadence_core::repository::OccurrenceRepository;
use uuid::Uuid;

/// Resolves a full occurrence id or a unique prefix of one.
pub async fn resolve_occurrence_id(repo: &(impl OccurrenceRepository + ?Sized), short_id: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(short_id) {
        return Ok(id);
    }
    if short_id.len() < 2 {
        return Err(anyhow!(CoreError::Validation(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }
    if !short_id.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        return Err(anyhow!(CoreError::Validation(format!(
            "'{}' is not an occurrence ID",
            short_id
        ))));
    }

    let occurrences = repo.find_occurrences_by_short_id_prefix(short_id).await?;
    if occurrences.len() == 1 {
        Ok(occurrences[0].id)
    } else if occurrences.is_empty() {
        Err(anyhow!(CoreError::NotFound(format!(
            "No occurrence found with ID prefix '{}'",
            short_id
        ))))
    } else {
        let candidates: Vec<(String, String)> = occurrences
            .into_iter()
            .map(|o| (o.id.to_string(), o.name))
            .collect();
        Err(anyhow!(CoreError::AmbiguousId(candidates)))
    }
}
