//! The draggable divider between the history view (top) and the input view
//! (bottom). The stored value is the input region's height.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SplitBounds {
    /// Smallest usable input height.
    pub(crate) minimum: u32,
    /// Height always left to the history view.
    pub(crate) reserved_top: u32,
    /// Input height when no preference was saved.
    pub(crate) default: u32,
}

impl Default for SplitBounds {
    fn default() -> Self {
        Self {
            minimum: 80,
            reserved_top: 100,
            default: 160,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    origin_y: i32,
    origin_height: u32,
    height: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct SplitLayout {
    bounds: SplitBounds,
    container_height: u32,
    position: Option<u32>,
    drag: Option<Drag>,
}

impl SplitLayout {
    pub(crate) fn new(bounds: SplitBounds, container_height: u32) -> Self {
        Self {
            bounds,
            container_height,
            position: None,
            drag: None,
        }
    }

    /// Upper bound for the input height. Never below `minimum`, so a
    /// container too small for both regions still yields a valid range.
    pub(crate) fn maximum(&self) -> u32 {
        self.container_height
            .saturating_sub(self.bounds.reserved_top)
            .max(self.bounds.minimum)
    }

    pub(crate) fn minimum(&self) -> u32 {
        self.bounds.minimum
    }

    fn clamp(&self, raw: i64) -> u32 {
        let clamped = raw.clamp(i64::from(self.minimum()), i64::from(self.maximum()));
        u32::try_from(clamped).unwrap_or(self.minimum())
    }

    /// Height to render right now: the live drag value, else the saved
    /// preference, else the default, always within bounds.
    pub(crate) fn height(&self) -> u32 {
        match self.drag {
            Some(drag) => drag.height,
            None => self.clamp(i64::from(self.position.unwrap_or(self.bounds.default))),
        }
    }

    /// The persisted preference, if one was ever set.
    pub(crate) fn position(&self) -> Option<u32> {
        self.position
    }

    pub(crate) fn container_height(&self) -> u32 {
        self.container_height
    }

    /// Adopt a restored preference. Clamping happens at render time so a
    /// preference made on a taller container survives a temporary shrink.
    pub(crate) fn restore(&mut self, position: u32) {
        self.position = Some(position);
    }

    pub(crate) fn set_container_height(&mut self, height: u32) {
        self.container_height = height;
        if let Some(drag) = self.drag {
            let height = self.clamp(i64::from(drag.height));
            self.drag = Some(Drag { height, ..drag });
        }
    }

    #[cfg(test)]
    pub(crate) fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub(crate) fn begin_drag(&mut self, pointer_y: i32) {
        let height = self.height();
        self.drag = Some(Drag {
            origin_y: pointer_y,
            origin_height: height,
            height,
        });
    }

    /// Follow the pointer. Moving up grows the input region. Returns the new
    /// height, or `None` when no drag is active.
    pub(crate) fn drag_to(&mut self, pointer_y: i32) -> Option<u32> {
        let drag = self.drag?;
        let raw = i64::from(drag.origin_height) + i64::from(drag.origin_y) - i64::from(pointer_y);
        let height = self.clamp(raw);
        self.drag = Some(Drag { height, ..drag });
        Some(height)
    }

    /// Finish the gesture, adopting the final height as the preference.
    /// Returns it exactly once per gesture.
    pub(crate) fn end_drag(&mut self) -> Option<u32> {
        let drag = self.drag.take()?;
        self.position = Some(drag.height);
        Some(drag.height)
    }
}
