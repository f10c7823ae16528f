//! Fetch a resolved object and decode its field.

use netcdf_parser::{decode_field_from_bytes, ScanGeometry};
use scene_common::{DecodedArray, SceneError, SceneResult};
use storage::{normalize_identifier, AddressingForm, ObjectStorage};
use tracing::{debug, instrument};

/// A decoded scene before cropping.
#[derive(Debug, Clone)]
pub struct DecodedScene {
    /// Bucket-relative key that was read
    pub key: String,
    pub array: DecodedArray,
    pub geometry: Option<ScanGeometry>,
}

/// Reads objects from the archive and decodes one named field.
///
/// Any failure after an object has been chosen, including a dropped
/// connection mid-download, surfaces as [`SceneError::DecodeFailure`].
#[derive(Clone)]
pub struct SceneDecoder {
    storage: ObjectStorage,
    field: String,
}

impl SceneDecoder {
    pub fn new(storage: ObjectStorage, field: impl Into<String>) -> Self {
        Self {
            storage,
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Fetch and decode `identifier`, given in any addressing form.
    #[instrument(skip(self), fields(field = %self.field))]
    pub async fn decode(&self, identifier: &str) -> SceneResult<DecodedScene> {
        let key = normalize_identifier(
            identifier,
            self.storage.bucket(),
            AddressingForm::BucketRelative,
        );

        let bytes = self
            .storage
            .get(&key)
            .await
            .map_err(|e| SceneError::decode(&key, format!("fetch failed: {}", e)))?;
        debug!(key = %key, size = bytes.len(), "Fetched object");

        let field = self.field.clone();
        let decoded = tokio::task::spawn_blocking(move || decode_field_from_bytes(&bytes, &field))
            .await
            .map_err(|e| SceneError::decode(&key, format!("decode task failed: {}", e)))?
            .map_err(|e| SceneError::decode(&key, e.to_string()))?;

        let array = DecodedArray::new(decoded.width, decoded.height, decoded.values)
            .map_err(|e| SceneError::decode(&key, e.to_string()))?;

        debug!(
            key = %key,
            rows = array.height(),
            cols = array.width(),
            has_geometry = decoded.geometry.is_some(),
            "Decoded scene"
        );

        Ok(DecodedScene {
            key,
            array,
            geometry: decoded.geometry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::{memory::InMemory, path::Path, ObjectStore};
    use std::sync::Arc;
    use test_utils::{abi_object_key, scene_netcdf_bytes, FixtureScene, BUCKET};

    async fn storage_with(key: &str, bytes: Vec<u8>) -> ObjectStorage {
        let store = InMemory::new();
        store
            .put(&Path::from(key), bytes::Bytes::from(bytes).into())
            .await
            .unwrap();
        ObjectStorage::with_store(Arc::new(store), BUCKET)
    }

    #[tokio::test]
    async fn test_decode_fixture_in_any_form() {
        let key = abi_object_key(2025, 365, 18, "M6", 13, "00205");
        let scene = FixtureScene::ramp(6, 4);
        let storage = storage_with(&key, scene_netcdf_bytes(&scene)).await;
        let decoder = SceneDecoder::new(storage, "CMI");

        for id in [
            key.clone(),
            format!("s3://{}/{}", BUCKET, key),
            format!("https://{}.s3.amazonaws.com/{}", BUCKET, key),
        ] {
            let decoded = decoder.decode(&id).await.unwrap();
            assert_eq!(decoded.key, key);
            assert_eq!(decoded.array.shape(), (4, 6));
            let expected = scene.expected(1, 2).unwrap();
            let got = decoded.array.get(1, 2).unwrap();
            assert!((got - expected).abs() < 1e-3, "{} vs {}", got, expected);
        }
    }

    #[tokio::test]
    async fn test_garbage_is_decode_failure() {
        let key = abi_object_key(2025, 365, 18, "M6", 13, "00205");
        let storage = storage_with(&key, b"<html>not a granule</html>".to_vec()).await;
        let err = SceneDecoder::new(storage, "CMI")
            .decode(&key)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "decode_failure");
    }

    #[tokio::test]
    async fn test_missing_object_is_decode_failure() {
        let storage = ObjectStorage::with_store(Arc::new(InMemory::new()), BUCKET);
        let err = SceneDecoder::new(storage, "CMI")
            .decode("ABI-L2-CMIPF/2025/365/18/gone.nc")
            .await
            .unwrap_err();
        assert!(matches!(err, SceneError::DecodeFailure { .. }));
    }
}
