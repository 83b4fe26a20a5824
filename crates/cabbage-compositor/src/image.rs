//! Lazy image recipes.
//!
//! An [`Image`] describes how to compute pixels rather than holding them:
//! solid fills, rasters, crops, transforms, opacity and "over" composites
//! nest freely and are evaluated per pixel by an image backend. All sampled
//! colors are premultiplied.

use cabbage_core::{Color, FrameBuffer, Rect, Transform2D, Vec2};
use std::sync::Arc;

#[derive(Debug)]
enum ImageNode {
    Solid(Color),
    Raster {
        width: u32,
        height: u32,
        pixels: Arc<[Color]>,
    },
    Cropped {
        source: Image,
        rect: Rect,
    },
    Transformed {
        source: Image,
        inverse: Option<Transform2D>,
        extent: Option<Rect>,
    },
    Opacity {
        source: Image,
        alpha: f32,
    },
    Over {
        foreground: Image,
        background: Image,
    },
}

/// An immutable, cheaply clonable image recipe.
#[derive(Debug, Clone)]
pub struct Image {
    node: Arc<ImageNode>,
}

impl Image {
    fn from_node(node: ImageNode) -> Self {
        Self {
            node: Arc::new(node),
        }
    }

    /// An infinite image of one straight-alpha color.
    pub fn solid(color: Color) -> Self {
        Self::from_node(ImageNode::Solid(color.premultiply()))
    }

    /// Snapshot a frame into a raster image covering `0..width, 0..height`.
    pub fn from_frame(frame: &FrameBuffer) -> Self {
        let mut pixels = Vec::with_capacity(frame.width as usize * frame.height as usize);
        for y in 0..frame.height {
            for x in 0..frame.width {
                let color = frame.read_color(x, y).unwrap_or(Color::TRANSPARENT);
                pixels.push(color.premultiply());
            }
        }
        Self::from_node(ImageNode::Raster {
            width: frame.width,
            height: frame.height,
            pixels: pixels.into(),
        })
    }

    /// Restrict the image to `rect`; everything outside becomes transparent.
    pub fn cropped(&self, rect: Rect) -> Self {
        Self::from_node(ImageNode::Cropped {
            source: self.clone(),
            rect,
        })
    }

    /// Move the image through an affine transform.
    ///
    /// A degenerate (non-invertible) transform yields an empty image.
    pub fn transformed(&self, transform: Transform2D) -> Self {
        if transform == Transform2D::IDENTITY {
            return self.clone();
        }
        let inverse = transform.is_invertible().then(|| transform.inverse());
        let extent = match inverse {
            Some(_) => self.extent().map(|rect| transform.transform_rect(rect)),
            None => Some(Rect::default()),
        };
        Self::from_node(ImageNode::Transformed {
            source: self.clone(),
            inverse,
            extent,
        })
    }

    /// Scale the image's alpha (and premultiplied color) by `alpha`.
    pub fn with_opacity(&self, alpha: f32) -> Self {
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha >= 1.0 {
            return self.clone();
        }
        Self::from_node(ImageNode::Opacity {
            source: self.clone(),
            alpha,
        })
    }

    /// Composite `self` over `background` with source-over.
    pub fn composited_over(&self, background: &Image) -> Self {
        Self::from_node(ImageNode::Over {
            foreground: self.clone(),
            background: background.clone(),
        })
    }

    /// Bounding rectangle of non-transparent pixels; `None` means infinite.
    pub fn extent(&self) -> Option<Rect> {
        match &*self.node {
            ImageNode::Solid(_) => None,
            ImageNode::Raster { width, height, .. } => Some(Rect::from_size(*width, *height)),
            ImageNode::Cropped { source, rect } => Some(match source.extent() {
                Some(inner) => inner.intersection(*rect).unwrap_or_default(),
                None => *rect,
            }),
            ImageNode::Transformed { extent, .. } => *extent,
            ImageNode::Opacity { source, .. } => source.extent(),
            ImageNode::Over {
                foreground,
                background,
            } => match (foreground.extent(), background.extent()) {
                (Some(a), Some(b)) => Some(a.union(b)),
                _ => None,
            },
        }
    }

    /// Premultiplied color at a point in pixel space.
    ///
    /// Pixel `(x, y)` is sampled at its center, `(x + 0.5, y + 0.5)`.
    pub fn sample(&self, point: Vec2) -> Color {
        match &*self.node {
            ImageNode::Solid(color) => *color,
            ImageNode::Raster {
                width,
                height,
                pixels,
            } => {
                if point.x < 0.0 || point.y < 0.0 {
                    return Color::TRANSPARENT;
                }
                let (x, y) = (point.x as u32, point.y as u32);
                if x >= *width || y >= *height {
                    return Color::TRANSPARENT;
                }
                pixels[y as usize * *width as usize + x as usize]
            }
            ImageNode::Cropped { source, rect } => {
                if rect.contains(point) {
                    source.sample(point)
                } else {
                    Color::TRANSPARENT
                }
            }
            ImageNode::Transformed {
                source, inverse, ..
            } => match inverse {
                Some(inverse) => source.sample(inverse.transform_point(point)),
                None => Color::TRANSPARENT,
            },
            ImageNode::Opacity { source, alpha } => source.sample(point).scale(*alpha),
            ImageNode::Over {
                foreground,
                background,
            } => foreground.sample(point).over(background.sample(point)),
        }
    }

    /// Premultiplied color of pixel `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        self.sample(Vec2::new(x as f32 + 0.5, y as f32 + 0.5))
    }
}
