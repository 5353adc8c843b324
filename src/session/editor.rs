//! Editing session facade
//!
//! [`Editor`] wires the scene, the tool state machine, the history log, the
//! viewport and a render surface together. Every completed annotation
//! mutation goes through here so that exactly one history entry is recorded
//! per user action.

use std::collections::VecDeque;

use image::RgbaImage;

use crate::annotations::{BlurRequest, TEXT_PLACEHOLDER, ToolMachine, ToolOutcome, ToolSettings};
use crate::capture::image::SourceImage;
use crate::config::EditorConfig;
use crate::domain::{ObjectId, ObjectKind, Padding, Placement, Point, Size, Tool};
use crate::render::image::{RenderSurface, SkiaSurface};
use crate::session::export::{encode_png, export_scene};
use crate::session::history::History;
use crate::session::lifecycle::{ListenerGuard, ListenerKind, ListenerRegistry, Liveness};
use crate::session::scene::{Scene, SceneItem};
use crate::session::shortcuts::{Command, Key, Modifiers, ShortcutContext, handle_key_event};
use crate::session::view::Viewport;

/// Listeners the editor needs while it is running
const LISTENERS: [ListenerKind; 3] = [ListenerKind::Keyboard, ListenerKind::Pointer, ListenerKind::Resize];

/// Text object currently in in-place edit mode
#[derive(Debug, Clone)]
struct TextEdit {
    id: ObjectId,
    /// Content when editing started
    original: String,
    /// Still showing the untouched placeholder; the first keystroke replaces it
    pristine: bool,
}

/// Blur extraction scheduled after a gesture
#[derive(Debug, Clone)]
struct BlurJob {
    request: BlurRequest,
    liveness: Liveness,
}

pub struct Editor {
    scene: Scene,
    history: History,
    tools: ToolMachine,
    selection: Vec<SceneItem>,
    view: Viewport,
    text_edit: Option<TextEdit>,
    pending: VecDeque<BlurJob>,
    liveness: Liveness,
    surface: Box<dyn RenderSurface>,
}

impl Editor {
    /// Editor with a tiny-skia surface, loading the configured font if any
    pub fn new(config: &EditorConfig) -> Self {
        let surface = match &config.font_path {
            Some(path) => SkiaSurface::new().with_font_file(path).unwrap_or_else(|err| {
                log::warn!("Text will not be rendered: {err:#}");
                SkiaSurface::new()
            }),
            None => SkiaSurface::new(),
        };
        Self::with_surface(config, Box::new(surface))
    }

    pub fn with_surface(config: &EditorConfig, surface: Box<dyn RenderSurface>) -> Self {
        let scene = Scene::new(
            SourceImage::empty(),
            config.padding,
            config.background.clone(),
            config.corner_radius,
        );
        let mut editor = Self {
            scene,
            history: History::new(),
            tools: ToolMachine::new(config.tool, config.tool_settings()),
            selection: Vec::new(),
            view: Viewport::default(),
            text_edit: None,
            pending: VecDeque::new(),
            liveness: Liveness::new(),
            surface,
        };
        editor.sync_surface();
        editor
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Token for deferred work started on behalf of this editor
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Register host input listeners for as long as the guard lives
    pub fn start<'a>(&self, registry: &'a dyn ListenerRegistry) -> ListenerGuard<'a> {
        log::debug!("Editor started");
        ListenerGuard::acquire(registry, &LISTENERS)
    }

    /// Tear the session down; pending work is discarded
    pub fn stop(&mut self) {
        self.liveness.kill();
        if !self.pending.is_empty() {
            log::debug!("Discarding {} pending blur jobs", self.pending.len());
        }
        self.pending.clear();
        self.tools.cancel(&mut self.scene);
        self.text_edit = None;
    }

    /// Install the decoded source image
    ///
    /// Returns `true` when this completed the one-time auto fit.
    pub fn attach_source(&mut self, source: SourceImage) -> bool {
        if !self.is_alive() {
            log::debug!("Ignoring source image for a stopped editor");
            return false;
        }
        self.scene.set_source(source);
        let fitted = self.view.try_auto_fit(self.fit_extent());
        self.sync_surface();
        fitted
    }

    /// Record the host container size
    ///
    /// Returns `true` when this completed the one-time auto fit.
    pub fn set_container_size(&mut self, width: f32, height: f32) -> bool {
        let fitted = self
            .view
            .set_container(Size::new(width, height), self.fit_extent());
        self.sync_surface();
        fitted
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn tool(&self) -> Tool {
        self.tools.tool()
    }

    pub fn tool_machine(&self) -> &ToolMachine {
        &self.tools
    }

    /// Style applied to objects created from now on
    pub fn tool_settings_mut(&mut self) -> &mut ToolSettings {
        self.tools.settings_mut()
    }

    pub fn selection(&self) -> &[SceneItem] {
        &self.selection
    }

    pub fn set_selection(&mut self, items: Vec<SceneItem>) {
        self.selection = items;
    }

    pub fn editing_text(&self) -> Option<ObjectId> {
        self.text_edit.as_ref().map(|edit| edit.id)
    }

    pub fn pending_jobs(&self) -> usize {
        self.pending.len()
    }

    pub fn surface(&self) -> &dyn RenderSurface {
        self.surface.as_ref()
    }

    pub fn zoom(&self) -> f32 {
        self.view.zoom()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ------------------------------------------------------------------
    // Tools and pointer input
    // ------------------------------------------------------------------

    pub fn set_tool(&mut self, tool: Tool) {
        self.finish_text();
        self.tools.set_tool(tool, &mut self.scene);
        if !tool.objects_interactive() {
            self.selection.clear();
        }
    }

    pub fn pointer_down(&mut self, p: Point) -> ToolOutcome {
        self.finish_text();
        let outcome = self.tools.pointer_down(&mut self.scene, &mut self.selection, p);
        if let ToolOutcome::TextCreated(id) = outcome {
            self.record();
            self.text_edit = Some(TextEdit {
                id,
                original: TEXT_PLACEHOLDER.to_string(),
                pristine: true,
            });
        }
        outcome
    }

    pub fn pointer_move(&mut self, p: Point) {
        self.tools.pointer_move(&mut self.scene, &self.selection, p);
    }

    pub fn pointer_up(&mut self, p: Point) -> ToolOutcome {
        let outcome = self.tools.pointer_up(&mut self.scene, &self.selection, p);
        match &outcome {
            ToolOutcome::Committed(_) => {
                self.record();
            }
            ToolOutcome::Moved => {
                self.drop_detached_blurs();
                self.record();
            }
            ToolOutcome::BlurRequested(request) => self.pending.push_back(BlurJob {
                request: *request,
                liveness: self.liveness.clone(),
            }),
            _ => {}
        }
        outcome
    }

    /// Run scheduled blur extractions
    ///
    /// Returns the number of blur objects added. Jobs whose session has been
    /// torn down are dropped.
    pub fn process_pending(&mut self) -> usize {
        let mut added = 0;
        while let Some(job) = self.pending.pop_front() {
            if !job.liveness.is_alive() {
                log::debug!("Dropping blur job for a closed session");
                continue;
            }
            let BlurRequest {
                bounds,
                block_size,
                style,
            } = job.request;
            let Some(mut object) = self.scene.create_blur(bounds, block_size, style) else {
                continue;
            };
            object.interactive = self.tools.tool().objects_interactive();
            self.scene.add(object);
            self.record();
            added += 1;
        }
        added
    }

    // ------------------------------------------------------------------
    // Selection and transforms
    // ------------------------------------------------------------------

    /// Hit-test `p` and make the result the selection (select tool only)
    pub fn select_at(&mut self, p: Point) -> Option<ObjectId> {
        if !self.tool().objects_interactive() {
            return None;
        }
        let hit = self.scene.object_at(p);
        self.selection = hit.map(SceneItem::Object).into_iter().collect();
        hit
    }

    pub fn select_all(&mut self) {
        if !self.tool().objects_interactive() {
            return;
        }
        self.selection = self
            .scene
            .objects()
            .iter()
            .map(|o| SceneItem::Object(o.id))
            .collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Delete the selected objects; fixed layers are skipped
    pub fn delete_selection(&mut self) -> bool {
        if self.tool() != Tool::Select {
            return false;
        }
        let selection = std::mem::take(&mut self.selection);
        let removed = selection
            .into_iter()
            .filter(|item| self.scene.remove(*item))
            .count();
        if removed == 0 {
            return false;
        }
        log::debug!("Deleted {removed} objects");
        self.record();
        true
    }

    pub fn move_selected(&mut self, dx: f32, dy: f32) -> bool {
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        let mut changed = false;
        for id in self.selected_ids() {
            changed |= self.scene.translate_object(id, dx, dy);
        }
        if changed {
            self.drop_detached_blurs();
            self.record();
        }
        changed
    }

    /// Multiply the scale of every selected object; blur regions keep their size
    pub fn scale_selected(&mut self, sx: f32, sy: f32) -> bool {
        if !(sx.is_finite() && sy.is_finite() && sx > 0.0 && sy > 0.0) || (sx == 1.0 && sy == 1.0) {
            return false;
        }
        self.transform_selected(|placement| {
            placement.scale_x *= sx;
            placement.scale_y *= sy;
        })
    }

    /// Rotate every selected object by `degrees`; blur regions stay axis-aligned
    pub fn rotate_selected(&mut self, degrees: f32) -> bool {
        if !degrees.is_finite() || degrees == 0.0 {
            return false;
        }
        self.transform_selected(|placement| {
            placement.angle = (placement.angle + degrees).rem_euclid(360.0);
        })
    }

    fn transform_selected(&mut self, mut f: impl FnMut(&mut Placement)) -> bool {
        let mut changed = false;
        for id in self.selected_ids() {
            if let Some(object) = self.scene.get_mut(id)
                && !object.is_blur()
            {
                f(&mut object.placement);
                changed = true;
            }
        }
        if changed {
            self.record();
        }
        changed
    }

    fn selected_ids(&self) -> Vec<ObjectId> {
        self.selection
            .iter()
            .filter_map(|item| match item {
                SceneItem::Object(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Text editing
    // ------------------------------------------------------------------

    pub fn insert_text(&mut self, input: &str) -> bool {
        let Some(edit) = self.text_edit.as_mut() else {
            return false;
        };
        let Some(ObjectKind::Text(text)) = self.scene.get_mut(edit.id).map(|o| &mut o.kind) else {
            return false;
        };
        if edit.pristine {
            text.content.clear();
            edit.pristine = false;
        }
        text.content.push_str(input);
        true
    }

    pub fn backspace(&mut self) -> bool {
        let Some(edit) = self.text_edit.as_mut() else {
            return false;
        };
        let Some(ObjectKind::Text(text)) = self.scene.get_mut(edit.id).map(|o| &mut o.kind) else {
            return false;
        };
        if edit.pristine {
            text.content.clear();
            edit.pristine = false;
        } else {
            text.content.pop();
        }
        true
    }

    /// Leave text edit mode
    ///
    /// A changed text records one history entry; a text left empty is removed
    /// (also recorded). Returns whether an entry was recorded.
    pub fn finish_text(&mut self) -> bool {
        let Some(edit) = self.text_edit.take() else {
            return false;
        };
        let content = match self.scene.get(edit.id).map(|o| &o.kind) {
            Some(ObjectKind::Text(text)) => text.content.clone(),
            _ => return false,
        };
        if content.is_empty() {
            self.scene.remove(SceneItem::Object(edit.id));
            self.selection.retain(|item| *item != SceneItem::Object(edit.id));
            log::debug!("Removed empty text {}", edit.id);
        } else if content == edit.original {
            return false;
        }
        self.record()
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.finish_text();
        self.tools.cancel(&mut self.scene);
        let changed = self.history.undo(&mut self.scene);
        self.after_restore();
        changed
    }

    pub fn redo(&mut self) -> bool {
        self.finish_text();
        self.tools.cancel(&mut self.scene);
        let changed = self.history.redo(&mut self.scene);
        self.after_restore();
        changed
    }

    fn after_restore(&mut self) {
        self.selection.clear();
        self.scene.set_interactive(self.tools.tool().objects_interactive());
    }

    /// Blur regions left off the image at the end of a move are removed
    fn drop_detached_blurs(&mut self) {
        let removed = self.scene.discard_detached_blurs();
        self.selection
            .retain(|item| !matches!(item, SceneItem::Object(id) if removed.contains(id)));
    }

    fn record(&mut self) -> bool {
        self.history.save(self.scene.objects())
    }

    // ------------------------------------------------------------------
    // Layout and zoom
    // ------------------------------------------------------------------

    pub fn set_padding(&mut self, padding: Padding) {
        self.scene.set_padding(padding);
        self.sync_surface();
    }

    pub fn set_background(&mut self, descriptor: impl Into<String>) {
        self.scene.set_background(descriptor);
        self.sync_surface();
    }

    pub fn set_corner_radius(&mut self, radius: f32) {
        self.scene.set_corner_radius(radius);
        self.sync_surface();
    }

    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        let zoom = self.view.set_zoom(zoom);
        self.sync_surface();
        zoom
    }

    pub fn zoom_in(&mut self) -> f32 {
        let zoom = self.view.zoom_in();
        self.sync_surface();
        zoom
    }

    pub fn zoom_out(&mut self) -> f32 {
        let zoom = self.view.zoom_out();
        self.sync_surface();
        zoom
    }

    pub fn zoom_to_fit(&mut self) -> f32 {
        let zoom = self.view.zoom_to_fit(self.scene.extent());
        self.sync_surface();
        zoom
    }

    /// Canvas extent for fitting; empty until the source image is known
    fn fit_extent(&self) -> Size {
        if self.scene.source().is_empty() {
            Size::default()
        } else {
            self.scene.extent()
        }
    }

    /// Resize the display surface to `extent * zoom`
    fn sync_surface(&mut self) {
        let zoom = self.view.effective_zoom();
        let size = self.scene.extent().scaled(zoom);
        self.surface.set_zoom(zoom);
        self.surface
            .set_dimensions(size.width.round() as u32, size.height.round() as u32);
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Rasterize at the current display zoom
    pub fn render(&self) -> anyhow::Result<RgbaImage> {
        self.surface.rasterize(&self.scene)
    }

    /// Flattened raster at zoom 1, rounded corners transparent
    pub fn export(&mut self) -> anyhow::Result<RgbaImage> {
        export_scene(&self.scene, self.surface.as_mut())
    }

    pub fn export_png(&mut self) -> anyhow::Result<Vec<u8>> {
        let image = self.export()?;
        encode_png(&image)
    }

    // ------------------------------------------------------------------
    // Keyboard
    // ------------------------------------------------------------------

    /// Map a key press to a command and apply it
    pub fn handle_key(&mut self, key: Key, modifiers: Modifiers) -> Option<Command> {
        let ctx = ShortcutContext {
            tool: self.tool(),
            editing_text: self.text_edit.is_some(),
        };
        let command = handle_key_event(ctx, key, modifiers)?;
        match command {
            Command::Undo => {
                self.undo();
            }
            Command::Redo => {
                self.redo();
            }
            Command::DeleteSelection => {
                self.delete_selection();
            }
            Command::Cancel => self.clear_selection(),
            Command::SelectTool(tool) => self.set_tool(tool),
            Command::ZoomIn => {
                self.zoom_in();
            }
            Command::ZoomOut => {
                self.zoom_out();
            }
            Command::ZoomToFit => {
                self.zoom_to_fit();
            }
            Command::TypeChar(c) => {
                self.insert_text(c.encode_utf8(&mut [0; 4]));
            }
            Command::DeleteBackward => {
                self.backspace();
            }
            Command::FinishText => {
                self.finish_text();
            }
        }
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ObjectSnapshot, Rect, RedactStyle};
    use crate::render::geometry::arrow;
    use crate::session::lifecycle::tests::FakeRegistry;
    use crate::session::shortcuts::Named;
    use image::Rgba;

    fn config() -> EditorConfig {
        EditorConfig {
            padding: Padding::uniform(32.0),
            corner_radius: 12.0,
            font_path: None,
            ..EditorConfig::default()
        }
    }

    fn editor() -> Editor {
        let mut editor = Editor::new(&config());
        editor.attach_source(SourceImage::new(RgbaImage::from_fn(200, 150, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8, 255])
        })));
        editor
    }

    fn draw(editor: &mut Editor, tool: Tool, from: Point, to: Point) -> ToolOutcome {
        editor.set_tool(tool);
        editor.pointer_down(from);
        editor.pointer_move(from.midpoint(to));
        editor.pointer_up(to)
    }

    fn snapshot(editor: &Editor) -> Vec<ObjectSnapshot> {
        editor.scene().objects().iter().map(ObjectSnapshot::capture).collect()
    }

    #[test]
    fn test_each_shape_records_one_entry() {
        let mut editor = editor();
        draw(&mut editor, Tool::Rect, Point::new(40.0, 40.0), Point::new(90.0, 80.0));
        draw(&mut editor, Tool::Ellipse, Point::new(60.0, 60.0), Point::new(20.0, 10.0));
        draw(&mut editor, Tool::Line, Point::new(0.0, 0.0), Point::new(30.0, 30.0));
        assert_eq!(editor.history().len(), 3);
        assert_eq!(editor.history().cursor(), Some(2));
        assert_eq!(editor.scene().objects().len(), 3);
    }

    #[test]
    fn test_arrow_properties() {
        let mut editor = editor();
        let (p1, p2) = (Point::new(50.0, 120.0), Point::new(150.0, 60.0));
        let ToolOutcome::Committed(id) = draw(&mut editor, Tool::Arrow, p1, p2) else {
            panic!("arrow not committed");
        };
        assert_eq!(editor.history().len(), 1);
        assert_eq!(editor.scene().objects().len(), 1);

        let group = editor.scene().get(id).unwrap();
        assert_eq!(group.placement.origin(), p1.midpoint(p2));
        let head = &group.children()[1];
        assert!((head.placement.angle - arrow::head_angle(p1, p2)).abs() < 1e-4);
    }

    #[test]
    fn test_small_blur_creates_nothing() {
        let mut editor = editor();
        let outcome = draw(&mut editor, Tool::Blur, Point::new(60.0, 60.0), Point::new(64.0, 160.0));
        assert_eq!(outcome, ToolOutcome::Discarded);
        assert_eq!(editor.pending_jobs(), 0);
        assert_eq!(editor.process_pending(), 0);
        assert!(editor.history().is_empty());
        assert!(editor.scene().objects().is_empty());
    }

    #[test]
    fn test_blur_outside_image_creates_nothing() {
        let mut editor = editor();
        // Entirely inside the left padding
        draw(&mut editor, Tool::Blur, Point::new(2.0, 40.0), Point::new(30.0, 100.0));
        assert_eq!(editor.pending_jobs(), 1);
        assert_eq!(editor.process_pending(), 0);
        assert!(editor.history().is_empty());
    }

    #[test]
    fn test_undo_redo_restores_identical_objects() {
        let mut editor = editor();
        draw(&mut editor, Tool::Rect, Point::new(40.0, 40.0), Point::new(90.0, 80.0));
        draw(&mut editor, Tool::Blur, Point::new(50.0, 50.0), Point::new(150.0, 120.0));
        assert_eq!(editor.process_pending(), 1);
        assert_eq!(editor.history().len(), 2);

        let objects = editor.scene().objects().to_vec();
        let json = serde_json::to_string(&snapshot(&editor)).unwrap();

        assert!(editor.undo());
        assert_eq!(editor.scene().objects().len(), 1);
        assert!(editor.redo());

        assert_eq!(editor.scene().objects(), objects.as_slice());
        assert_eq!(serde_json::to_string(&snapshot(&editor)).unwrap(), json);
    }

    #[test]
    fn test_undo_to_empty_and_back() {
        let mut editor = editor();
        draw(&mut editor, Tool::Rect, Point::new(40.0, 40.0), Point::new(90.0, 80.0));
        let after = editor.scene().objects().to_vec();

        assert!(editor.undo());
        assert!(editor.scene().objects().is_empty());
        assert_eq!(editor.history().cursor(), None);
        assert!(!editor.can_undo());
        assert!(!editor.undo());

        assert!(editor.redo());
        assert_eq!(editor.scene().objects(), after.as_slice());
        assert!(!editor.can_redo());
    }

    #[test]
    fn test_restore_reapplies_interactivity() {
        let mut editor = editor();
        draw(&mut editor, Tool::Rect, Point::new(40.0, 40.0), Point::new(90.0, 80.0));
        draw(&mut editor, Tool::Rect, Point::new(100.0, 100.0), Point::new(120.0, 120.0));
        editor.set_tool(Tool::Select);
        editor.select_all();
        assert_eq!(editor.selection().len(), 2);

        editor.undo();
        assert!(editor.selection().is_empty());
        assert!(editor.scene().objects().iter().all(|o| o.interactive));
    }

    #[test]
    fn test_delete_skips_fixed_layers() {
        let mut editor = editor();
        draw(&mut editor, Tool::Rect, Point::new(40.0, 40.0), Point::new(90.0, 80.0));
        editor.set_tool(Tool::Select);

        editor.set_selection(vec![SceneItem::Background, SceneItem::Image]);
        assert!(!editor.delete_selection());
        assert_eq!(editor.history().len(), 1);

        let id = editor.scene().objects()[0].id;
        editor.set_selection(vec![SceneItem::Background, SceneItem::Object(id)]);
        assert!(editor.delete_selection());
        assert!(editor.scene().objects().is_empty());
        assert_eq!(editor.history().len(), 2);
    }

    #[test]
    fn test_delete_requires_select_tool() {
        let mut editor = editor();
        draw(&mut editor, Tool::Rect, Point::new(40.0, 40.0), Point::new(90.0, 80.0));
        let id = editor.scene().objects()[0].id;
        editor.set_selection(vec![SceneItem::Object(id)]);
        assert!(!editor.delete_selection());
        assert_eq!(editor.scene().objects().len(), 1);
    }

    #[test]
    fn test_text_lifecycle() {
        let mut editor = editor();
        editor.set_tool(Tool::Text);
        let ToolOutcome::TextCreated(id) = editor.pointer_down(Point::new(60.0, 60.0)) else {
            panic!("text not created");
        };
        // Recorded immediately, with the placeholder
        assert_eq!(editor.history().len(), 1);
        assert_eq!(editor.editing_text(), Some(id));

        editor.insert_text("Hi");
        editor.insert_text("!");
        editor.backspace();
        let ObjectKind::Text(text) = &editor.scene().get(id).unwrap().kind else {
            panic!("not text");
        };
        assert_eq!(text.content, "Hi");

        assert!(editor.finish_text());
        assert_eq!(editor.history().len(), 2);
        assert_eq!(editor.editing_text(), None);
    }

    #[test]
    fn test_unchanged_text_adds_no_entry_and_empty_text_is_removed() {
        let mut editor = editor();
        editor.set_tool(Tool::Text);
        editor.pointer_down(Point::new(60.0, 60.0));
        assert!(!editor.finish_text());
        assert_eq!(editor.history().len(), 1);

        let ToolOutcome::TextCreated(id) = editor.pointer_down(Point::new(100.0, 100.0)) else {
            panic!("text not created");
        };
        editor.backspace();
        assert!(editor.finish_text());
        assert!(editor.scene().get(id).is_none());
        assert_eq!(editor.history().len(), 3);
    }

    #[test]
    fn test_select_drag_and_transforms_record_entries() {
        let mut editor = editor();
        draw(&mut editor, Tool::Rect, Point::new(40.0, 40.0), Point::new(90.0, 80.0));
        editor.set_tool(Tool::Select);

        let outcome = draw(&mut editor, Tool::Select, Point::new(50.0, 50.0), Point::new(60.0, 70.0));
        assert_eq!(outcome, ToolOutcome::Moved);
        assert_eq!(editor.history().len(), 2);
        let id = editor.scene().objects()[0].id;
        assert_eq!(editor.scene().get(id).unwrap().placement.origin(), Point::new(50.0, 60.0));

        assert!(editor.move_selected(5.0, 0.0));
        assert!(editor.rotate_selected(45.0));
        assert!(editor.scale_selected(2.0, 1.5));
        assert!(!editor.scale_selected(1.0, 1.0));
        assert_eq!(editor.history().len(), 5);

        let placement = editor.scene().get(id).unwrap().placement;
        assert_eq!(placement.left, 55.0);
        assert_eq!(placement.angle, 45.0);
        assert_eq!((placement.scale_x, placement.scale_y), (2.0, 1.5));
    }

    #[test]
    fn test_blur_survives_drag_through_padding() {
        let mut editor = editor();
        draw(&mut editor, Tool::Blur, Point::new(40.0, 40.0), Point::new(60.0, 60.0));
        assert_eq!(editor.process_pending(), 1);
        let id = editor.scene().objects()[0].id;

        editor.set_tool(Tool::Select);
        editor.pointer_down(Point::new(50.0, 50.0));
        // Fully inside the left padding, then back over the image
        editor.pointer_move(Point::new(10.0, 50.0));
        editor.pointer_move(Point::new(90.0, 50.0));
        assert_eq!(editor.pointer_up(Point::new(90.0, 50.0)), ToolOutcome::Moved);

        assert_eq!(editor.history().len(), 2);
        let blur = editor.scene().get(id).unwrap();
        assert_eq!(blur.placement.origin(), Point::new(80.0, 40.0));
        let ObjectKind::Blur(region) = &blur.kind else {
            panic!("not a blur");
        };
        assert!(region.patch.is_some());
    }

    #[test]
    fn test_blur_released_off_image_is_removed() {
        let mut editor = editor();
        draw(&mut editor, Tool::Blur, Point::new(40.0, 40.0), Point::new(60.0, 60.0));
        editor.process_pending();

        editor.set_tool(Tool::Select);
        editor.pointer_down(Point::new(50.0, 50.0));
        editor.pointer_move(Point::new(30.0, 50.0));
        assert_eq!(editor.pointer_up(Point::new(10.0, 50.0)), ToolOutcome::Moved);

        assert!(editor.scene().objects().is_empty());
        assert!(editor.selection().is_empty());
        assert_eq!(editor.history().len(), 2);
        assert!(editor.undo());
        assert_eq!(editor.scene().objects().len(), 1);
    }

    #[test]
    fn test_select_at_hits_topmost() {
        let mut editor = editor();
        draw(&mut editor, Tool::Rect, Point::new(40.0, 40.0), Point::new(90.0, 80.0));
        assert_eq!(editor.select_at(Point::new(50.0, 50.0)), None);

        editor.set_tool(Tool::Select);
        let id = editor.scene().objects()[0].id;
        assert_eq!(editor.select_at(Point::new(50.0, 50.0)), Some(id));
        assert_eq!(editor.select_at(Point::new(5.0, 5.0)), None);
        assert!(editor.selection().is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut editor = editor();
        for i in 0..60 {
            let x = 40.0 + i as f32;
            draw(&mut editor, Tool::Line, Point::new(x, 40.0), Point::new(x, 90.0));
        }
        assert_eq!(editor.history().len(), 50);
        let mut undos = 0;
        while editor.undo() {
            undos += 1;
        }
        assert_eq!(undos, 50);
        assert!(editor.scene().objects().is_empty());
    }

    #[test]
    fn test_zoom_clamping_resizes_surface() {
        let mut editor = editor();
        assert_eq!(editor.set_zoom(0.05), 0.1);
        assert_eq!(editor.set_zoom(3.0), 2.0);
        // 200x150 image with 32px padding
        assert_eq!(editor.surface().dimensions(), (528, 428));
        assert_eq!(editor.set_zoom(0.5), 0.5);
        assert_eq!(editor.surface().dimensions(), (132, 107));
    }

    #[test]
    fn test_auto_fit_signal_fires_once() {
        let mut editor = Editor::new(&config());
        assert_eq!(editor.zoom(), 0.0);
        assert!(!editor.set_container_size(196.0, 171.0));

        let fitted = editor.attach_source(SourceImage::new(RgbaImage::new(200, 150)));
        assert!(fitted);
        assert!((editor.zoom() - 0.5).abs() < 1e-6);
        assert!(!editor.set_container_size(2000.0, 2000.0));
        assert!((editor.zoom_to_fit() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_layout_changes_preserve_zoom() {
        let mut editor = editor();
        editor.set_zoom(0.5);
        editor.set_padding(Padding::uniform(0.0));
        assert_eq!(editor.surface().dimensions(), (100, 75));
        editor.set_corner_radius(0.0);
        editor.set_background("#ffffff");
        assert_eq!(editor.zoom(), 0.5);
        assert!(editor.history().is_empty());
    }

    #[test]
    fn test_export_restores_display_state() {
        let mut editor = editor();
        editor.set_zoom(0.5);
        let before = editor.surface().dimensions();

        let image = editor.export().unwrap();
        assert_eq!(image.dimensions(), (264, 214));
        assert_eq!(image.get_pixel(0, 0)[3], 0);
        assert_eq!(editor.surface().dimensions(), before);
        assert_eq!(editor.surface().zoom(), 0.5);
        assert_eq!(editor.surface().clip(), None);

        let png = editor.export_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn test_stop_discards_pending_work() {
        let mut editor = editor();
        let registry = FakeRegistry::default();
        {
            let _guard = editor.start(&registry);
            assert_eq!(registry.live.borrow().len(), 3);

            draw(&mut editor, Tool::Blur, Point::new(50.0, 50.0), Point::new(150.0, 120.0));
            assert_eq!(editor.pending_jobs(), 1);
            editor.stop();
        }
        assert!(registry.live.borrow().is_empty());
        assert_eq!(editor.process_pending(), 0);
        assert!(editor.scene().objects().is_empty());
        assert!(!editor.attach_source(SourceImage::new(RgbaImage::new(10, 10))));
    }

    #[test]
    fn test_keyboard_commands() {
        let mut editor = editor();
        editor.handle_key(Key::Character('r'), Modifiers::NONE);
        assert_eq!(editor.tool(), Tool::Rect);
        editor.pointer_down(Point::new(40.0, 40.0));
        editor.pointer_up(Point::new(80.0, 80.0));

        assert_eq!(editor.handle_key(Key::Character('z'), Modifiers::CTRL), Some(Command::Undo));
        assert!(editor.scene().objects().is_empty());
        editor.handle_key(Key::Character('y'), Modifiers::CTRL);
        assert_eq!(editor.scene().objects().len(), 1);

        editor.handle_key(Key::Character('v'), Modifiers::NONE);
        editor.select_all();
        editor.handle_key(Key::Named(Named::Delete), Modifiers::NONE);
        assert!(editor.scene().objects().is_empty());
    }

    #[test]
    fn test_typing_into_text() {
        let mut editor = editor();
        editor.handle_key(Key::Character('t'), Modifiers::NONE);
        let ToolOutcome::TextCreated(id) = editor.pointer_down(Point::new(60.0, 60.0)) else {
            panic!("text not created");
        };
        // Letters type instead of switching tools
        editor.handle_key(Key::Character('r'), Modifiers::NONE);
        editor.handle_key(Key::Character('b'), Modifiers::NONE);
        editor.handle_key(Key::Named(Named::Escape), Modifiers::NONE);
        assert_eq!(editor.tool(), Tool::Text);
        let ObjectKind::Text(text) = &editor.scene().get(id).unwrap().kind else {
            panic!("not text");
        };
        assert_eq!(text.content, "rb");
        assert_eq!(editor.editing_text(), None);
    }

    #[test]
    fn test_blur_style_follows_settings() {
        let mut editor = editor();
        editor.tool_settings_mut().redact_style = RedactStyle::Sample;
        editor.tool_settings_mut().block_size = 4;
        draw(&mut editor, Tool::Blur, Point::new(50.0, 50.0), Point::new(150.0, 120.0));
        editor.process_pending();
        let ObjectKind::Blur(blur) = &editor.scene().objects()[0].kind else {
            panic!("not a blur");
        };
        assert_eq!(blur.style, RedactStyle::Sample);
        assert_eq!(blur.block_size, 4);
        assert_eq!(blur.original_bounds, Rect::new(50.0, 50.0, 100.0, 70.0));
    }
}
