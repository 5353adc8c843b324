//! Tool interaction state machine
//!
//! Converts pointer gestures into object creation and mutation for the
//! active tool. The machine only holds transient gesture state; the scene
//! owns every object, and the caller decides what goes into history based on
//! the returned [`ToolOutcome`].

use crate::domain::{
    AnnotationObject, Color, EllipseShape, Group, LineShape, ObjectId, ObjectKind, Placement,
    Point, Rect, RectShape, RedactStyle, ShapeStyle, TextShape, TextStyle, Tool, TriangleShape,
};
use crate::render::geometry::arrow;
use crate::render::pixelate;
use crate::session::scene::{Scene, SceneItem};

/// Placeholder content of a freshly created text object
pub const TEXT_PLACEHOLDER: &str = "Text";

/// Dash pattern of the in-progress blur outline
const BLUR_PREVIEW_DASH: [f32; 2] = [6.0, 4.0];

/// Style settings applied to newly created objects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSettings {
    pub color: Color,
    pub stroke_width: f32,
    pub font_size: f32,
    pub block_size: u32,
    pub redact_style: RedactStyle,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            color: Color::default(),
            stroke_width: 3.0,
            font_size: 24.0,
            block_size: 10,
            redact_style: RedactStyle::Pixelate,
        }
    }
}

impl ToolSettings {
    fn outline(&self) -> ShapeStyle {
        ShapeStyle::outline(self.color, self.stroke_width)
    }
}

/// Transient gesture state
#[derive(Debug, Clone, PartialEq)]
pub enum ToolState {
    Idle,
    /// A drawing tool is dragging out `live`
    Drawing {
        tool: Tool,
        start: Point,
        live: ObjectId,
    },
    /// Select tool is moving the current selection
    Dragging { origin: Point, last: Point },
}

/// Blur extraction to run once the gesture has finished
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurRequest {
    /// Drawn rectangle in scene space, before cropping
    pub bounds: Rect,
    pub block_size: u32,
    pub style: RedactStyle,
}

/// What a pointer event did to the scene
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Nothing durable changed
    None,
    /// A drawing gesture started
    Started(ObjectId),
    /// A finished object is in the scene and needs a history entry
    Committed(ObjectId),
    /// A text object was placed and should enter edit mode
    TextCreated(ObjectId),
    /// The selection was dragged to a new position
    Moved,
    /// A blur region passed the size check and awaits extraction
    BlurRequested(BlurRequest),
    /// The gesture was dropped without creating anything
    Discarded,
    /// Select tool clicked; the selection may have changed
    SelectionChanged,
}

#[derive(Debug)]
pub struct ToolMachine {
    tool: Tool,
    settings: ToolSettings,
    state: ToolState,
}

impl ToolMachine {
    pub fn new(tool: Tool, settings: ToolSettings) -> Self {
        Self {
            tool,
            settings,
            state: ToolState::Idle,
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ToolSettings {
        &mut self.settings
    }

    pub fn state(&self) -> &ToolState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ToolState::Idle
    }

    /// Switch tools, abandoning any in-progress gesture
    ///
    /// Interactivity of every object is re-derived from the new tool.
    pub fn set_tool(&mut self, tool: Tool, scene: &mut Scene) {
        self.cancel(scene);
        self.tool = tool;
        scene.set_interactive(tool.objects_interactive());
        log::debug!("Tool switched to {tool:?}");
    }

    /// Drop the current gesture and any live object it created
    pub fn cancel(&mut self, scene: &mut Scene) {
        if let ToolState::Drawing { live, .. } = std::mem::replace(&mut self.state, ToolState::Idle) {
            scene.remove(SceneItem::Object(live));
        }
    }

    pub fn pointer_down(
        &mut self,
        scene: &mut Scene,
        selection: &mut Vec<SceneItem>,
        p: Point,
    ) -> ToolOutcome {
        if !self.is_idle() {
            return ToolOutcome::None;
        }

        match self.tool {
            Tool::Select => {
                let Some(hit) = scene.object_at(p) else {
                    selection.clear();
                    return ToolOutcome::SelectionChanged;
                };
                let item = SceneItem::Object(hit);
                if !selection.contains(&item) {
                    selection.clear();
                    selection.push(item);
                }
                self.state = ToolState::Dragging { origin: p, last: p };
                ToolOutcome::SelectionChanged
            }
            Tool::Text => {
                let id = scene.allocate_id();
                scene.add(AnnotationObject::new(
                    id,
                    Placement::at(p),
                    ObjectKind::Text(TextShape {
                        content: TEXT_PLACEHOLDER.to_string(),
                        style: TextStyle {
                            color: self.settings.color,
                            font_size: self.settings.font_size,
                        },
                    }),
                ));
                ToolOutcome::TextCreated(id)
            }
            tool => {
                let id = scene.allocate_id();
                scene.add(self.live_object(tool, id, p));
                self.state = ToolState::Drawing {
                    tool,
                    start: p,
                    live: id,
                };
                ToolOutcome::Started(id)
            }
        }
    }

    pub fn pointer_move(&mut self, scene: &mut Scene, selection: &[SceneItem], p: Point) {
        match &mut self.state {
            ToolState::Idle => {}
            ToolState::Drawing { start, live, .. } => {
                let (start, live) = (*start, *live);
                if let Some(object) = scene.get_mut(live) {
                    resize_live(object, start, p);
                }
            }
            ToolState::Dragging { last, .. } => {
                let delta = p - *last;
                *last = p;
                translate_selection(scene, selection, delta);
            }
        }
    }

    /// Finish the gesture; the machine is always `Idle` afterwards
    pub fn pointer_up(&mut self, scene: &mut Scene, selection: &[SceneItem], p: Point) -> ToolOutcome {
        match std::mem::replace(&mut self.state, ToolState::Idle) {
            ToolState::Idle => ToolOutcome::None,
            ToolState::Dragging { origin, last } => {
                translate_selection(scene, selection, p - last);
                if p == origin {
                    ToolOutcome::None
                } else {
                    ToolOutcome::Moved
                }
            }
            ToolState::Drawing { tool, start, live } => match tool {
                Tool::Arrow => {
                    scene.remove(SceneItem::Object(live));
                    let group = self.build_arrow(scene, start, p);
                    ToolOutcome::Committed(scene.add(group))
                }
                Tool::Blur => {
                    scene.remove(SceneItem::Object(live));
                    let bounds = Rect::from_corners(start, p);
                    if pixelate::is_too_small(bounds) {
                        log::debug!("Discarding blur region {bounds:?}: below minimum size");
                        return ToolOutcome::Discarded;
                    }
                    ToolOutcome::BlurRequested(BlurRequest {
                        bounds,
                        block_size: self.settings.block_size,
                        style: self.settings.redact_style,
                    })
                }
                _ => match scene.get_mut(live) {
                    Some(object) => {
                        resize_live(object, start, p);
                        ToolOutcome::Committed(live)
                    }
                    None => ToolOutcome::Discarded,
                },
            },
        }
    }

    /// Zero-sized object for the start of a drawing gesture
    fn live_object(&self, tool: Tool, id: ObjectId, p: Point) -> AnnotationObject {
        let kind = match tool {
            Tool::Ellipse => ObjectKind::Ellipse(EllipseShape {
                rx: 0.0,
                ry: 0.0,
                style: self.settings.outline(),
            }),
            Tool::Line | Tool::Arrow => {
                return AnnotationObject::new(
                    id,
                    Placement::default(),
                    ObjectKind::Line(LineShape {
                        start: p,
                        end: p,
                        style: self.settings.outline(),
                    }),
                );
            }
            Tool::Blur => ObjectKind::Rect(RectShape {
                width: 0.0,
                height: 0.0,
                style: ShapeStyle {
                    stroke: self.settings.color,
                    stroke_width: 1.0,
                    fill: Some(self.settings.color.with_alpha_factor(0.15)),
                    dash: Some(BLUR_PREVIEW_DASH),
                },
            }),
            _ => ObjectKind::Rect(RectShape {
                width: 0.0,
                height: 0.0,
                style: self.settings.outline(),
            }),
        };
        AnnotationObject::new(id, Placement::at(p), kind)
    }

    /// Arrow group centered between the two endpoints
    fn build_arrow(&self, scene: &mut Scene, start: Point, end: Point) -> AnnotationObject {
        let center = start.midpoint(end);
        let group_id = scene.allocate_id();
        let line = AnnotationObject::new(
            scene.allocate_id(),
            Placement::default(),
            ObjectKind::Line(LineShape {
                start: start - center,
                end: end - center,
                style: self.settings.outline(),
            }),
        );
        let head = AnnotationObject::new(
            scene.allocate_id(),
            Placement {
                angle: arrow::head_angle(start, end),
                ..Placement::at(end - center)
            },
            ObjectKind::Triangle(TriangleShape {
                width: arrow::HEAD_LENGTH,
                height: arrow::HEAD_LENGTH,
                fill: self.settings.color,
            }),
        );
        AnnotationObject::new(
            group_id,
            Placement::at(center),
            ObjectKind::Arrow(Group {
                children: vec![line, head],
            }),
        )
    }
}

/// Resize a live object so that any drag direction gives a normalized shape
fn resize_live(object: &mut AnnotationObject, start: Point, current: Point) {
    let bounds = Rect::from_corners(start, current);
    match &mut object.kind {
        ObjectKind::Rect(rect) => {
            object.placement.left = bounds.left;
            object.placement.top = bounds.top;
            rect.width = bounds.width;
            rect.height = bounds.height;
        }
        ObjectKind::Ellipse(ellipse) => {
            object.placement.left = bounds.left;
            object.placement.top = bounds.top;
            ellipse.rx = bounds.width * 0.5;
            ellipse.ry = bounds.height * 0.5;
        }
        ObjectKind::Line(line) => line.end = current,
        _ => {}
    }
}

fn translate_selection(scene: &mut Scene, selection: &[SceneItem], delta: Point) {
    if delta == Point::default() {
        return;
    }
    for item in selection {
        if let SceneItem::Object(id) = item {
            scene.translate_object(*id, delta.x, delta.y);
        }
    }
}
