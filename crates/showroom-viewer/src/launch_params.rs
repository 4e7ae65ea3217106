//! Launch parameter parsing for the viewer.
//!
//! On native, parameters are parsed from command-line arguments using clap.
//! On WASM, defaults are used (CLI argument parsing is not available).

use std::path::PathBuf;

use showroom::{Catalog, Layout, Showroom};

/// Which built-in catalog to show when no catalog file is given.
#[derive(Default, PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(not(target_family = "wasm"), derive(clap::ValueEnum))]
pub enum LayoutChoice {
    /// Every car parked on a circle.
    #[default]
    Carousel,
    /// One themed scene at a time.
    Scenes,
}

impl From<LayoutChoice> for Layout {
    fn from(choice: LayoutChoice) -> Self {
        match choice {
            LayoutChoice::Carousel => Layout::Carousel,
            LayoutChoice::Scenes => Layout::Scenes,
        }
    }
}

/// Launch parameters for the viewer.
#[derive(Debug, Default)]
pub struct LaunchParams {
    /// TOML catalog to load instead of a built-in one.
    pub catalog: Option<PathBuf>,
    /// Built-in catalog to use when `catalog` is unset or fails to load.
    pub layout: LayoutChoice,
    /// Index of the entity to view first.
    pub start: usize,
}

impl LaunchParams {
    /// Build the showroom these parameters describe.
    ///
    /// A catalog file that cannot be loaded, or a start index outside it, is
    /// logged and replaced by the built-in default.
    pub fn showroom(&self) -> showroom::Result<Showroom> {
        let catalog = match &self.catalog {
            Some(path) => Catalog::load_from_path(path).or_else(|e| {
                tracing::warn!("{e}; using the built-in {:?} catalog", self.layout);
                Catalog::builtin(self.layout.into())
            })?,
            None => Catalog::builtin(self.layout.into())?,
        };

        let len = catalog.registry.len();
        match Showroom::with_start(catalog.clone(), self.start) {
            Ok(showroom) => Ok(showroom),
            Err(e) => {
                tracing::warn!("{e}; starting at the first of {len} entities");
                Ok(Showroom::new(catalog))
            }
        }
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    #[command(about = "3D car configurator")]
    struct CliArgs {
        /// Catalog file (TOML) listing the cars and scenes to show.
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Built-in catalog to use when no catalog file is given.
        #[arg(long, value_enum, default_value_t = LayoutChoice::default())]
        layout: LayoutChoice,

        /// Index of the car or scene to view first.
        #[arg(long, default_value_t = 0)]
        start: usize,
    }

    pub fn parse() -> LaunchParams {
        let args = CliArgs::parse();
        LaunchParams {
            catalog: args.catalog,
            layout: args.layout,
            start: args.start,
        }
    }
}

/// Parse launch parameters from CLI args (native) or use defaults (WASM).
pub fn parse() -> LaunchParams {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        LaunchParams::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_builtin_carousel() {
        let showroom = LaunchParams::default().showroom().unwrap();
        assert_eq!(showroom.layout(), Layout::Carousel);
        assert_eq!(showroom.viewer().viewed_index(), 0);
    }

    #[test]
    fn test_missing_catalog_falls_back() {
        let params = LaunchParams {
            catalog: Some(PathBuf::from("/nonexistent/showroom.toml")),
            layout: LayoutChoice::Scenes,
            start: 1,
        };
        let showroom = params.showroom().unwrap();
        assert_eq!(showroom.layout(), Layout::Scenes);
        assert_eq!(showroom.viewer().viewed_index(), 1);
    }

    #[test]
    fn test_out_of_range_start_falls_back() {
        let params = LaunchParams {
            start: 99,
            ..LaunchParams::default()
        };
        assert_eq!(params.showroom().unwrap().viewer().viewed_index(), 0);
    }
}
