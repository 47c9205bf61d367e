//! Tool Selection and Style State
//!
//! `ToolState` is the single record of everything the control surface can
//! change. It is mutated only through [`ToolState::apply`], and every draw
//! operation receives a [`Style`] derived from it at the moment of drawing.

use std::fmt;
use std::str::FromStr;

use crate::color::Rgb;
use crate::error::ControlError;
use crate::export::ExportFormat;

/// Shadow blur radius applied when the shadow toggle is on
pub const SHADOW_BLUR: f32 = 10.0;

/// The closed set of drawing tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
    Rectangle,
    Circle,
    Line,
    Text,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::Brush,
        Tool::Eraser,
        Tool::Rectangle,
        Tool::Circle,
        Tool::Line,
        Tool::Text,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::Brush => "brush",
            Tool::Eraser => "eraser",
            Tool::Rectangle => "rectangle",
            Tool::Circle => "circle",
            Tool::Line => "line",
            Tool::Text => "text",
        }
    }
}

impl FromStr for Tool {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ControlError::UnknownTool(s.to_owned()))
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One change coming from the control surface
#[derive(Debug, Clone, PartialEq)]
pub enum ControlChange {
    Tool(Tool),
    Color(String),
    StrokeWidth(f32),
    Opacity(f32),
    Shadow(bool),
    Gradient(bool),
    ExportFormat(ExportFormat),
}

/// Current tool and style settings
#[derive(Debug, Clone, PartialEq)]
pub struct ToolState {
    active_tool: Tool,
    /// Value of the color picker, independent of the eraser override
    color: Rgb,
    stroke_width: f32,
    opacity: f32,
    shadow_enabled: bool,
    gradient_enabled: bool,
    export_format: ExportFormat,
}

impl ToolState {
    pub fn new(color: Rgb, stroke_width: f32, opacity: f32) -> Result<Self, ControlError> {
        validate_stroke_width(stroke_width)?;
        validate_opacity(opacity)?;
        Ok(Self {
            color,
            stroke_width,
            opacity,
            ..Self::default()
        })
    }

    /// Apply a control change. Invalid values are rejected and leave the
    /// state untouched.
    pub fn apply(&mut self, change: ControlChange) -> Result<(), ControlError> {
        match change {
            ControlChange::Tool(tool) => self.active_tool = tool,
            ControlChange::Color(hex) => self.color = Rgb::from_hex(&hex)?,
            ControlChange::StrokeWidth(width) => {
                validate_stroke_width(width)?;
                self.stroke_width = width;
            }
            ControlChange::Opacity(opacity) => {
                validate_opacity(opacity)?;
                self.opacity = opacity;
            }
            ControlChange::Shadow(enabled) => self.shadow_enabled = enabled,
            ControlChange::Gradient(enabled) => self.gradient_enabled = enabled,
            ControlChange::ExportFormat(format) => self.export_format = format,
        }
        Ok(())
    }

    pub fn active_tool(&self) -> Tool {
        self.active_tool
    }

    /// Picker color as chosen by the user
    pub fn picker_color(&self) -> Rgb {
        self.color
    }

    /// Color actually laid down by the active tool. The eraser paints the
    /// canvas `background`.
    pub fn stroke_color(&self, background: Rgb) -> Rgb {
        match self.active_tool {
            Tool::Eraser => background,
            _ => self.color,
        }
    }

    pub fn stroke_width(&self) -> f32 {
        self.stroke_width
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn shadow_enabled(&self) -> bool {
        self.shadow_enabled
    }

    pub fn gradient_enabled(&self) -> bool {
        self.gradient_enabled
    }

    pub fn export_format(&self) -> ExportFormat {
        self.export_format
    }

    /// Snapshot the settings a draw call needs on a canvas filled with
    /// `background`
    pub fn style(&self, background: Rgb) -> Style {
        let color = self.stroke_color(background);
        Style {
            color,
            line_width: self.stroke_width,
            alpha: self.opacity,
            shadow: self.shadow_enabled.then_some(Shadow {
                blur: SHADOW_BLUR,
                color,
            }),
            gradient: self.gradient_enabled,
        }
    }
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            active_tool: Tool::default(),
            color: Rgb::BLACK,
            stroke_width: 5.0,
            opacity: 1.0,
            shadow_enabled: false,
            gradient_enabled: false,
            export_format: ExportFormat::default(),
        }
    }
}

fn validate_stroke_width(width: f32) -> Result<(), ControlError> {
    if width.is_finite() && width > 0.0 {
        Ok(())
    } else {
        Err(ControlError::InvalidStrokeWidth(width))
    }
}

fn validate_opacity(opacity: f32) -> Result<(), ControlError> {
    if (0.0..=1.0).contains(&opacity) {
        Ok(())
    } else {
        Err(ControlError::InvalidOpacity(opacity))
    }
}

/// Drop shadow settings, zero offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub blur: f32,
    pub color: Rgb,
}

/// Resolved drawing style for a single draw call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub color: Rgb,
    pub line_width: f32,
    /// Global alpha (0.0-1.0)
    pub alpha: f32,
    pub shadow: Option<Shadow>,
    /// Shapes stroke with a color-to-white gradient when set
    pub gradient: bool,
}
