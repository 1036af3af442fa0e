//! Appliance snapshot documents: decoding and on-disk lookup.
//!
//! A bundle directory holds one `<appliance id>.json` document per appliance,
//! in the same camelCase wire format the backend returns.

use std::io;
use std::path::{Component, Path, PathBuf};

use kitchenconnect_domain::appliance::Appliance;
use kitchenconnect_domain::error::KitchenError;
use kitchenconnect_domain::id::ApplianceId;

/// The demo oven shipped with the crate.
pub const DEFAULT_OVEN: &str = include_str!("../assets/oven.json");

/// Decode and validate one snapshot document.
///
/// # Errors
///
/// Returns [`KitchenError::MalformedData`] when the document is not valid
/// JSON, misses a field, or carries a blank identifier or name.
pub fn decode_appliance(document: &str) -> Result<Appliance, KitchenError> {
    let appliance: Appliance = serde_json::from_str(document).map_err(KitchenError::malformed)?;
    appliance.validate()?;
    Ok(appliance)
}

/// Path of the document backing `id` inside `dir`.
///
/// # Errors
///
/// Returns [`KitchenError::SourceUnavailable`] when `id` would resolve
/// outside `dir` (path separators, `..`, absolute paths).
pub fn document_path(dir: &Path, id: &ApplianceId) -> Result<PathBuf, KitchenError> {
    let file_name = format!("{id}.json");
    let mut components = Path::new(&file_name).components();
    let contained = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !contained || id.as_str().contains(['/', '\\']) || id.as_str().contains("..") {
        return Err(KitchenError::unavailable(
            id.clone(),
            "identifier is not a plain file name",
        ));
    }
    Ok(dir.join(file_name))
}

/// Read the document backing `id` from `dir`.
///
/// # Errors
///
/// Returns [`KitchenError::SourceUnavailable`] when the document cannot be
/// read or `id` is not a plain file name, or [`KitchenError::MalformedData`]
/// when it does not decode to the appliance it is named after.
pub async fn read_appliance(dir: &Path, id: &ApplianceId) -> Result<Appliance, KitchenError> {
    let path = document_path(dir, id)?;
    let document = tokio::fs::read_to_string(&path)
        .await
        .map_err(|err| unavailable(id, &path, &err))?;
    let appliance = decode_appliance(&document)?;
    if appliance.id() != id {
        return Err(KitchenError::malformed(format!(
            "{} describes appliance {}",
            path.display(),
            appliance.id()
        )));
    }
    Ok(appliance)
}

fn unavailable(id: &ApplianceId, path: &Path, err: &io::Error) -> KitchenError {
    KitchenError::unavailable(id.clone(), format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitchenconnect_domain::appliance::{ApplianceState, Program};
    use kitchenconnect_domain::error::ErrorKind;

    #[test]
    fn should_decode_default_oven() {
        let oven = decode_appliance(DEFAULT_OVEN).unwrap();
        assert_eq!(oven.id().as_str(), "12CFD");
        assert_eq!(oven.name(), "My oven");
        assert_eq!(oven.program(), Program::Grill);
        assert_eq!(oven.appliance_state(), ApplianceState::ReadyToStart);
        assert_eq!(oven.display_temperature_with_unit(), "24\u{2103}");
    }

    #[test]
    fn should_reject_document_with_missing_field() {
        let err = decode_appliance(r#"{"applianceId":"12CFD"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }

    #[test]
    fn should_reject_document_with_blank_id() {
        let document = DEFAULT_OVEN.replace("12CFD", " ");
        let err = decode_appliance(&document).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }

    #[tokio::test]
    async fn should_read_document_named_after_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("12CFD.json"), DEFAULT_OVEN).unwrap();

        let oven = read_appliance(dir.path(), &ApplianceId::from("12CFD"))
            .await
            .unwrap();

        assert_eq!(oven.name(), "My oven");
    }

    #[tokio::test]
    async fn should_report_unavailable_when_document_missing() {
        let dir = tempfile::tempdir().unwrap();

        let err = read_appliance(dir.path(), &ApplianceId::from("12CFD"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            KitchenError::SourceUnavailable { ref id, .. } if id.as_str() == "12CFD"
        ));
    }

    #[tokio::test]
    async fn should_refuse_ids_escaping_bundle_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("bundle");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(root.path().join("outside.json"), DEFAULT_OVEN).unwrap();
        let absolute = root.path().join("outside");

        for raw in ["../outside", absolute.to_str().unwrap(), "a\\b", ".."] {
            let id = ApplianceId::from(raw);
            assert!(document_path(&dir, &id).is_err(), "{raw} should be refused");
            let err = read_appliance(&dir, &id).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
        }
    }

    #[test]
    fn should_place_plain_id_inside_directory() {
        let path = document_path(Path::new("bundle"), &ApplianceId::from("12CFD")).unwrap();
        assert_eq!(path, Path::new("bundle").join("12CFD.json"));
    }

    #[tokio::test]
    async fn should_reject_document_describing_other_appliance() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("34ABE.json"), DEFAULT_OVEN).unwrap();

        let err = read_appliance(dir.path(), &ApplianceId::from("34ABE"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }
}
