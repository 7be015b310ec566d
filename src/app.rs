// Application state module
// Explicit state with change notification in place of reactive bindings

use crate::color::BackgroundColor;
use crate::display::DisplayTarget;
use crate::generator::WallpaperRequest;
use crate::geometry::LogoRatio;
use crate::image_loader::Logo;
use crate::preview::PreviewInput;
use std::sync::Arc;

/// Which part of the state changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Logo,
    Color,
    Ratio,
    Targets,
}

type Listener = Box<dyn FnMut(StateChange, &AppState) + Send>;

/// What the user is editing for the session
pub struct AppState {
    logo: Option<Arc<Logo>>,
    color: BackgroundColor,
    ratio: LogoRatio,
    targets: Vec<DisplayTarget>,
    listeners: Vec<Listener>,
}

impl AppState {
    pub fn new(color: BackgroundColor, ratio: LogoRatio) -> Self {
        Self {
            logo: None,
            color,
            ratio,
            targets: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Call `listener` after every effective change
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(StateChange, &AppState) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn color(&self) -> BackgroundColor {
        self.color
    }

    pub fn ratio(&self) -> LogoRatio {
        self.ratio
    }

    pub fn targets(&self) -> &[DisplayTarget] {
        &self.targets
    }

    pub fn set_logo(&mut self, logo: Logo) {
        self.logo = Some(Arc::new(logo));
        self.notify(StateChange::Logo);
    }

    pub fn set_color(&mut self, color: BackgroundColor) {
        if self.color != color {
            self.color = color;
            self.notify(StateChange::Color);
        }
    }

    pub fn set_ratio(&mut self, ratio: LogoRatio) {
        if self.ratio != ratio {
            self.ratio = ratio;
            self.notify(StateChange::Ratio);
        }
    }

    pub fn set_targets(&mut self, targets: Vec<DisplayTarget>) {
        if self.targets != targets {
            self.targets = targets;
            self.notify(StateChange::Targets);
        }
    }

    /// Generation request, once a logo is loaded
    pub fn request(&self) -> Option<WallpaperRequest> {
        self.logo.as_ref().map(|logo| WallpaperRequest {
            logo: logo.clone(),
            color: self.color,
            ratio: self.ratio,
        })
    }

    /// Preview input, once a logo and at least one target are known
    pub fn preview_input(&self) -> Option<PreviewInput> {
        if self.targets.is_empty() {
            return None;
        }
        self.request().map(|req| PreviewInput {
            logo: req.logo,
            color: req.color,
            ratio: req.ratio,
            targets: self.targets.clone(),
        })
    }

    fn notify(&mut self, change: StateChange) {
        // Listeners see the state, so take them out while they run
        let mut listeners = std::mem::take(&mut self.listeners);
        for listener in &mut listeners {
            listener(change, self);
        }
        listeners.append(&mut self.listeners);
        self.listeners = listeners;
    }
}
