use anyhow::{Context, Result, bail};
use log::debug;
use once_cell::sync::Lazy;
use platform_dirs::AppDirs;
use scan_effect::{
    codec::UploadLimits, preprocess::PreprocessConfig, quality::QualityThresholds,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

const APP_NAME: &str = "medscan";
static CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| Mutex::new(Config::default()));

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct Config {
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(skip)]
    pub is_first_run: bool,

    #[serde(default)]
    pub processing: Processing,

    #[serde(default)]
    pub upload: Upload,

    #[serde(default)]
    pub quality: Quality,

    #[serde(default)]
    pub preprocess: Preprocess,
}

#[derive(Serialize, Deserialize, Debug, Clone, Derivative)]
#[derivative(Default)]
pub struct Processing {
    /// Preset used when `--preset` is not given.
    #[derivative(Default(value = "\"xray\".to_string()"))]
    pub default_preset: String,

    #[derivative(Default(value = "1.5"))]
    pub xray_contrast: f32,

    /// Empty means next to the input file.
    pub output_dir: String,

    #[derivative(Default(value = "\"_processed\".to_string()"))]
    pub output_suffix: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Derivative)]
#[derivative(Default)]
pub struct Upload {
    #[derivative(Default(value = "16"))]
    pub max_file_size_mb: usize,

    #[derivative(Default(value = "4096"))]
    pub max_dimension: u32,

    #[derivative(Default(
        value = "[\"png\", \"jpg\", \"jpeg\", \"gif\", \"bmp\", \"tiff\"].map(String::from).to_vec()"
    ))]
    pub allowed_extensions: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Derivative)]
#[derivative(Default)]
pub struct Quality {
    #[derivative(Default(value = "100"))]
    pub min_dimension: u32,

    #[derivative(Default(value = "30.0"))]
    pub min_mean: f64,

    #[derivative(Default(value = "225.0"))]
    pub max_mean: f64,

    #[derivative(Default(value = "20.0"))]
    pub min_std_dev: f64,

    #[derivative(Default(value = "100.0"))]
    pub min_sharpness: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Derivative)]
#[derivative(Default)]
pub struct Preprocess {
    #[derivative(Default(value = "224"))]
    pub target_size: u32,

    pub keep_aspect: bool,

    #[derivative(Default(value = "[0.485, 0.456, 0.406]"))]
    pub mean: [f32; 3],

    #[derivative(Default(value = "[0.229, 0.224, 0.225]"))]
    pub std: [f32; 3],

    #[derivative(Default(value = "0.1"))]
    pub lung_padding: f32,
}

impl Config {
    /// Resolve the config path, then load it or write the defaults.
    pub fn init(&mut self, path: Option<&Path>) -> Result<()> {
        self.config_path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let Some(app_dirs) = AppDirs::new(Some(APP_NAME), true) else {
                    bail!("no config directory available on this platform");
                };
                app_dirs.config_dir.join(format!("{APP_NAME}.toml"))
            }
        };

        if let Some(dir) = self.config_path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("create config dir {} failed", dir.display()))?;
            }
        }

        self.load().with_context(|| "load config file failed")?;
        debug!("{:?}", self);
        Ok(())
    }

    fn load(&mut self) -> Result<()> {
        match fs::read_to_string(&self.config_path) {
            Ok(text) => match toml::from_str::<Config>(&text) {
                Ok(mut c) => {
                    c.config_path = self.config_path.clone();
                    c.is_first_run = self.is_first_run;
                    *self = c;
                    Ok(())
                }
                Err(e) => {
                    log::warn!("invalid config {}: {e}", self.config_path.display());
                    self.reset_to_defaults()
                }
            },
            Err(_) => self.reset_to_defaults(),
        }
    }

    fn reset_to_defaults(&mut self) -> Result<()> {
        let config_path = self.config_path.clone();
        *self = Config {
            config_path,
            is_first_run: true,
            ..Default::default()
        };

        if self.config_path.exists() {
            let mut bak_file = self.config_path.clone().into_os_string();
            bak_file.push(".bak");
            _ = fs::copy(&self.config_path, bak_file);
        }

        self.save()
    }

    pub fn save(&self) -> Result<()> {
        match toml::to_string_pretty(self) {
            Ok(text) => Ok(fs::write(&self.config_path, text)
                .with_context(|| "save config failed".to_string())?),
            Err(e) => bail!(format!("convert config to toml format failed. {e:?}")),
        }
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits::new()
            .with_max_file_size(self.upload.max_file_size_mb * 1024 * 1024)
            .with_max_dimension(self.upload.max_dimension)
            .with_allowed_extensions(
                self.upload
                    .allowed_extensions
                    .iter()
                    .map(|ext| ext.to_ascii_lowercase())
                    .collect(),
            )
    }

    pub fn quality_thresholds(&self) -> QualityThresholds {
        QualityThresholds::new()
            .with_min_dimension(self.quality.min_dimension)
            .with_min_mean(self.quality.min_mean)
            .with_max_mean(self.quality.max_mean)
            .with_min_std_dev(self.quality.min_std_dev)
            .with_min_sharpness(self.quality.min_sharpness)
    }

    pub fn preprocess_config(&self) -> PreprocessConfig {
        PreprocessConfig::new()
            .with_target_width(self.preprocess.target_size)
            .with_target_height(self.preprocess.target_size)
            .with_keep_aspect(self.preprocess.keep_aspect)
            .with_mean(self.preprocess.mean)
            .with_std(self.preprocess.std)
    }
}

pub fn init(path: Option<&Path>) -> Result<()> {
    let mut config = CONFIG
        .lock()
        .map_err(|_| anyhow::anyhow!("config lock poisoned"))?;
    config.init(path)
}

pub fn all() -> Config {
    match CONFIG.lock() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

pub fn save(conf: Config) -> Result<()> {
    let mut config = CONFIG
        .lock()
        .map_err(|_| anyhow::anyhow!("config lock poisoned"))?;
    *config = conf;
    config.save()
}
