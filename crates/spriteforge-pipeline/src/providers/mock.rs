//! Mock provider for testing
//!
//! Serves all three stages without network calls: solid-color PNG
//! sprites, short animated GIF clips, and a minimal rigged GLB. Failure
//! injection flags let orchestration tests force a stage down.

use spriteforge_core::{ContentHash, ForgeError, Result};
use std::path::{Path, PathBuf};

use crate::provider::{
    ensure_source_exists, AnimationProvider, AnimationRequest, ModelProvider, ModelRequest,
    ProviderStatus, SpriteProvider, SpriteRequest, StageResult,
};

/// A mock provider that generates placeholder artifacts locally
#[derive(Default)]
pub struct MockProvider {
    fail_sprite: bool,
    fail_animation: bool,
    fail_model: bool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the sprite stage to fail with a retryable provider error.
    pub fn failing_sprite() -> Self {
        Self {
            fail_sprite: true,
            ..Self::default()
        }
    }

    /// Force the animation stage to fail with a retryable provider error.
    pub fn failing_animation() -> Self {
        Self {
            fail_animation: true,
            ..Self::default()
        }
    }

    /// Force the model stage to fail with a retryable provider error.
    pub fn failing_model() -> Self {
        Self {
            fail_model: true,
            ..Self::default()
        }
    }

    fn injected_failure(&self, stage: &str) -> ForgeError {
        ForgeError::Provider {
            provider: "mock".to_string(),
            status: Some(503),
            message: format!("Injected {} failure", stage),
        }
    }
}

impl SpriteProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn health_check(&self) -> Result<ProviderStatus> {
        Ok(ProviderStatus::Available)
    }

    fn generate(&self, request: &SpriteRequest, output_dir: &Path) -> Result<StageResult> {
        if self.fail_sprite {
            return Err(self.injected_failure("sprite"));
        }

        std::fs::create_dir_all(output_dir)?;
        // Keep mock artifacts small regardless of the requested resolution.
        let size = request.size.min(64);
        let path = write_solid_png(output_dir, &request.name, size)?;

        let hash = ContentHash::from_file(&path).map(|h| h.to_prefixed_hex()).ok();
        let mut result = StageResult::new(path.to_string_lossy(), "mock")
            .with_metadata("prompt", request.style.enrich_prompt(&request.prompt));
        result.content_hash = hash;
        Ok(result)
    }
}

impl AnimationProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn health_check(&self) -> Result<ProviderStatus> {
        Ok(ProviderStatus::Available)
    }

    fn animate(&self, request: &AnimationRequest, output_dir: &Path) -> Result<StageResult> {
        if self.fail_animation {
            return Err(self.injected_failure("animation"));
        }
        ensure_source_exists(&request.sprite_path)?;

        std::fs::create_dir_all(output_dir)?;
        let path = write_pulsing_gif(
            output_dir,
            &format!("{}_{}", request.name, request.kind),
        )?;

        let hash = ContentHash::from_file(&path).map(|h| h.to_prefixed_hex()).ok();
        let mut result = StageResult::new(path.to_string_lossy(), "mock")
            .with_metadata("animation", request.kind.to_string());
        result.content_hash = hash;
        Ok(result)
    }
}

impl ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn health_check(&self) -> Result<ProviderStatus> {
        Ok(ProviderStatus::Available)
    }

    fn generate_rigged(&self, request: &ModelRequest, output_dir: &Path) -> Result<StageResult> {
        if self.fail_model {
            return Err(self.injected_failure("model"));
        }
        ensure_source_exists(&request.sprite_path)?;

        std::fs::create_dir_all(output_dir)?;
        let path = write_minimal_glb(output_dir, &format!("{}_rigged", request.name))?;

        let hash = ContentHash::from_file(&path).map(|h| h.to_prefixed_hex()).ok();
        let mut result = StageResult::new(path.to_string_lossy(), "mock")
            .with_metadata("skeleton", request.skeleton.to_string());
        result.content_hash = hash;
        Ok(result)
    }
}

/// Deterministic color from the name hash, so each character gets a
/// distinct sprite.
fn name_color(name: &str) -> [u8; 3] {
    let hash_val = name
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    [
        ((hash_val >> 16) & 0xFF) as u8,
        ((hash_val >> 8) & 0xFF) as u8,
        (hash_val & 0xFF) as u8,
    ]
}

fn write_solid_png(output_dir: &Path, name: &str, size: u32) -> Result<PathBuf> {
    let [r, g, b] = name_color(name);

    let mut img_data = Vec::with_capacity((size * size * 4) as usize);
    for _ in 0..(size * size) {
        img_data.extend_from_slice(&[r, g, b, 255]);
    }

    let path = output_dir.join(format!("{}.png", name));
    let img = image::RgbaImage::from_raw(size, size, img_data)
        .ok_or_else(|| ForgeError::provider("mock", "Failed to create image buffer"))?;
    img.save(&path)
        .map_err(|e| ForgeError::provider("mock", format!("Failed to save PNG: {}", e)))?;

    Ok(path)
}

/// A 4-frame looping GIF that pulses the name color, the closest local
/// stand-in for a video clip.
fn write_pulsing_gif(output_dir: &Path, name: &str) -> Result<PathBuf> {
    use image::codecs::gif::{GifEncoder, Repeat};
    use image::{Delay, Frame};

    const SIZE: u32 = 32;
    let [r, g, b] = name_color(name);

    let path = output_dir.join(format!("{}.gif", name));
    let file = std::fs::File::create(&path)?;
    let mut encoder = GifEncoder::new(file);
    encoder
        .set_repeat(Repeat::Infinite)
        .map_err(|e| ForgeError::provider("mock", format!("Failed to write GIF: {}", e)))?;

    for step in 0u32..4 {
        let scale = 255 - step * 40;
        let pixel = [
            (r as u32 * scale / 255) as u8,
            (g as u32 * scale / 255) as u8,
            (b as u32 * scale / 255) as u8,
            255,
        ];
        let mut img_data = Vec::with_capacity((SIZE * SIZE * 4) as usize);
        for _ in 0..(SIZE * SIZE) {
            img_data.extend_from_slice(&pixel);
        }
        let buffer = image::RgbaImage::from_raw(SIZE, SIZE, img_data)
            .ok_or_else(|| ForgeError::provider("mock", "Failed to create frame buffer"))?;
        let frame = Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(120, 1));
        encoder
            .encode_frame(frame)
            .map_err(|e| ForgeError::provider("mock", format!("Failed to write GIF: {}", e)))?;
    }

    Ok(path)
}

/// Write a minimal valid GLB (single triangle). Also used by the
/// coordinator as the stand-in when the model stage soft-fails.
pub fn write_minimal_glb(output_dir: &Path, name: &str) -> Result<PathBuf> {
    let json = serde_json::json!({
        "asset": { "version": "2.0", "generator": "spriteforge-mock" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{
            "primitives": [{
                "attributes": { "POSITION": 0 },
                "indices": 1
            }]
        }],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "max": [1.0, 1.0, 0.0],
                "min": [-1.0, 0.0, 0.0]
            },
            {
                "bufferView": 1,
                "componentType": 5123,
                "count": 3,
                "type": "SCALAR",
                "max": [2],
                "min": [0]
            }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
        ],
        "buffers": [{ "byteLength": 44 }]
    });

    let json_str = serde_json::to_string(&json)?;

    // Pad JSON chunk to 4-byte alignment
    let json_bytes = json_str.as_bytes();
    let json_padded_len = (json_bytes.len() + 3) & !3;
    let mut json_padded = json_bytes.to_vec();
    json_padded.resize(json_padded_len, b' ');

    let vertices: [f32; 9] = [
        -1.0, 0.0, 0.0, // v0
        1.0, 0.0, 0.0, // v1
        0.0, 1.0, 0.0, // v2
    ];
    let indices: [u16; 3] = [0, 1, 2];

    let mut bin_data = Vec::new();
    for v in &vertices {
        bin_data.extend_from_slice(&v.to_le_bytes());
    }
    for i in &indices {
        bin_data.extend_from_slice(&i.to_le_bytes());
    }
    let bin_padded_len = (bin_data.len() + 3) & !3;
    bin_data.resize(bin_padded_len, 0);

    let total_len = 12 + 8 + json_padded.len() as u32 + 8 + bin_data.len() as u32;

    let path = output_dir.join(format!("{}.glb", name));
    let mut file = std::fs::File::create(&path)?;
    use std::io::Write;

    file.write_all(b"glTF")?; // magic
    file.write_all(&2u32.to_le_bytes())?; // version
    file.write_all(&total_len.to_le_bytes())?;

    file.write_all(&(json_padded.len() as u32).to_le_bytes())?;
    file.write_all(&0x4E4F534Au32.to_le_bytes())?; // "JSON"
    file.write_all(&json_padded)?;

    file.write_all(&(bin_data.len() as u32).to_le_bytes())?;
    file.write_all(&0x004E4942u32.to_le_bytes())?; // "BIN\0"
    file.write_all(&bin_data)?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{AnimationKind, ArtStyle, SkeletonKind};

    fn temp_dir() -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("spriteforge_mock_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sprite_request(name: &str) -> SpriteRequest {
        SpriteRequest {
            name: name.to_string(),
            prompt: "a brave knight".to_string(),
            style: ArtStyle::Pixel,
            size: 64,
        }
    }

    #[test]
    fn test_mock_provider_health() {
        let provider = MockProvider::new();
        assert_eq!(
            SpriteProvider::health_check(&provider).unwrap(),
            ProviderStatus::Available
        );
    }

    #[test]
    fn test_mock_generate_sprite() {
        let dir = temp_dir();
        let provider = MockProvider::new();

        let result = provider.generate(&sprite_request("test_knight"), &dir).unwrap();
        assert!(Path::new(&result.artifact).exists());
        assert_eq!(result.provider, "mock");
        assert!(result.content_hash.is_some());

        let img = image::open(&result.artifact).unwrap();
        assert_eq!(img.width(), 64);
        assert_eq!(img.height(), 64);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_mock_animate() {
        let dir = temp_dir();
        let provider = MockProvider::new();

        let sprite = provider.generate(&sprite_request("walker"), &dir).unwrap();

        let request = AnimationRequest {
            name: "walker".to_string(),
            sprite_path: PathBuf::from(&sprite.artifact),
            kind: AnimationKind::Walk,
            style: ArtStyle::Pixel,
            duration_secs: 4,
        };
        let result = provider.animate(&request, &dir).unwrap();
        let path = Path::new(&result.artifact);
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().contains("walk"));

        // GIF magic
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(&bytes[..3], b"GIF");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_mock_animate_requires_sprite() {
        let dir = temp_dir();
        let provider = MockProvider::new();

        let request = AnimationRequest {
            name: "ghost".to_string(),
            sprite_path: dir.join("missing.png"),
            kind: AnimationKind::Idle,
            style: ArtStyle::Pixel,
            duration_secs: 4,
        };
        let err = provider.animate(&request, &dir).unwrap_err();
        assert!(!err.is_retryable());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_mock_generate_rigged() {
        let dir = temp_dir();
        let provider = MockProvider::new();

        let sprite = provider.generate(&sprite_request("golem"), &dir).unwrap();

        let request = ModelRequest {
            name: "golem".to_string(),
            sprite_path: PathBuf::from(&sprite.artifact),
            prompt: "a stone golem".to_string(),
            style: ArtStyle::LowPoly,
            skeleton: SkeletonKind::Humanoid,
        };
        let result = provider.generate_rigged(&request, &dir).unwrap();
        let path = Path::new(&result.artifact);
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "glb");

        let bytes = std::fs::read(path).unwrap();
        assert_eq!(&bytes[..4], b"glTF");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_failure_injection_is_retryable() {
        let dir = temp_dir();
        let provider = MockProvider::failing_sprite();

        let err = provider.generate(&sprite_request("doomed"), &dir).unwrap_err();
        assert!(err.is_retryable());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_minimal_glb_is_well_formed() {
        let dir = temp_dir();
        let path = write_minimal_glb(&dir, "placeholder").unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"glTF");
        let declared_len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        assert_eq!(declared_len as usize, bytes.len());

        std::fs::remove_dir_all(&dir).ok();
    }
}
