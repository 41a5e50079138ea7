//! Frame acquisition.
//!
//! `FrameSource` is the seam between whatever produces pixels and the
//! streaming side; `CubeScene` is the built-in source, a small CPU rasterizer
//! of a slowly rotating cube that can render a single view or a stereo pair.

use anyhow::Result;

use crate::frame::RgbaSurface;

/// Something that can produce the next frame's rendered view(s).
pub trait FrameSource {
    fn resolution(&self) -> [u32; 2];

    /// Advance animation state and render this tick's view(s): one surface
    /// per camera.
    fn next_views(&mut self) -> Result<Vec<RgbaSurface>>;
}

const BACKGROUND: [u8; 4] = [0x22, 0x22, 0x22, 0xff];
const FACE_RGB: [f32; 3] = [0.0, 1.0, 0.0];
const CAMERA_DISTANCE: f32 = 5.0;
const FOV_DEGREES: f32 = 75.0;
const SPIN_STEP: f32 = 0.001;
const STEREO_EYE_OFFSET: f32 = 0.5;
const LIGHT_DIR: [f32; 3] = [0.37, 0.65, 0.66];

// Unit cube centered at the origin.
const VERTICES: [[f32; 3]; 8] = [
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, 0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
];

// Quads wound so that the first triangle's cross product points outward.
const FACES: [[usize; 4]; 6] = [
    [4, 5, 6, 7], // +z
    [1, 0, 3, 2], // -z
    [5, 1, 2, 6], // +x
    [0, 4, 7, 3], // -x
    [7, 6, 2, 3], // +y
    [0, 1, 5, 4], // -y
];

/// Rotating cube scene. Each call to `next_views` advances the rotation by a
/// fixed step and rasterizes either one centered view or two views with the
/// camera shifted to x = -0.5 and x = +0.5.
pub struct CubeScene {
    width: u32,
    height: u32,
    stereo: bool,
    angle_x: f32,
    angle_y: f32,
}

impl CubeScene {
    pub fn new(width: u32, height: u32, stereo: bool) -> Self {
        Self {
            width,
            height,
            stereo,
            angle_x: 0.0,
            angle_y: 0.0,
        }
    }

    fn rotated_vertices(&self) -> [[f32; 3]; 8] {
        let (sx, cx) = self.angle_x.sin_cos();
        let (sy, cy) = self.angle_y.sin_cos();
        let mut out = [[0.0f32; 3]; 8];
        for (slot, v) in out.iter_mut().zip(VERTICES.iter()) {
            // Rotate around x, then around y.
            let y1 = v[1] * cx - v[2] * sx;
            let z1 = v[1] * sx + v[2] * cx;
            let x2 = v[0] * cy + z1 * sy;
            let z2 = -v[0] * sy + z1 * cy;
            *slot = [x2, y1, z2];
        }
        out
    }

    fn render_view(&self, eye_x: f32) -> RgbaSurface {
        let mut surface = RgbaSurface::filled(self.width, self.height, BACKGROUND);
        let verts = self.rotated_vertices();

        let cx = self.width as f32 / 2.0;
        let cy = self.height as f32 / 2.0;
        let focal = cy / (FOV_DEGREES.to_radians() / 2.0).tan();

        let project = |v: [f32; 3]| -> [f32; 2] {
            let depth = CAMERA_DISTANCE - v[2];
            [
                cx + focal * (v[0] - eye_x) / depth,
                cy - focal * v[1] / depth,
            ]
        };

        for quad in FACES {
            let [a, b, c, d] = quad.map(|i| verts[i]);
            let normal = normalize(cross(sub(b, a), sub(c, a)));

            // Visible iff the face points toward the camera.
            let center = scale(add(add(a, b), add(c, d)), 0.25);
            let to_camera = sub([eye_x, 0.0, CAMERA_DISTANCE], center);
            if dot(normal, to_camera) <= 0.0 {
                continue;
            }

            let intensity = 0.25 + 0.75 * dot(normal, LIGHT_DIR).max(0.0);
            let rgba = [
                (FACE_RGB[0] * intensity * 255.0) as u8,
                (FACE_RGB[1] * intensity * 255.0) as u8,
                (FACE_RGB[2] * intensity * 255.0) as u8,
                0xff,
            ];

            let pa = project(a);
            let pb = project(b);
            let pc = project(c);
            let pd = project(d);
            fill_triangle(&mut surface, pa, pb, pc, rgba);
            fill_triangle(&mut surface, pa, pc, pd, rgba);
        }

        surface
    }
}

impl FrameSource for CubeScene {
    fn resolution(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    fn next_views(&mut self) -> Result<Vec<RgbaSurface>> {
        self.angle_x += SPIN_STEP;
        self.angle_y += SPIN_STEP;

        let views = if self.stereo {
            vec![
                self.render_view(-STEREO_EYE_OFFSET),
                self.render_view(STEREO_EYE_OFFSET),
            ]
        } else {
            vec![self.render_view(0.0)]
        };
        Ok(views)
    }
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn add(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn scale(a: [f32; 3], s: f32) -> [f32; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = dot(v, v).sqrt();
    if len <= f32::EPSILON {
        return [0.0, 0.0, 0.0];
    }
    scale(v, 1.0 / len)
}

/// Scanline-free triangle fill: edge functions over the clipped bounding box.
/// Accepts either winding.
fn fill_triangle(surface: &mut RgbaSurface, a: [f32; 2], b: [f32; 2], c: [f32; 2], rgba: [u8; 4]) {
    let edge = |p: [f32; 2], q: [f32; 2], r: [f32; 2]| -> f32 {
        (q[0] - p[0]) * (r[1] - p[1]) - (q[1] - p[1]) * (r[0] - p[0])
    };

    let area = edge(a, b, c);
    if area.abs() <= f32::EPSILON {
        return;
    }

    let min_x = a[0].min(b[0]).min(c[0]).floor().max(0.0) as u32;
    let min_y = a[1].min(b[1]).min(c[1]).floor().max(0.0) as u32;
    let max_x = (a[0].max(b[0]).max(c[0]).ceil() as i64).clamp(0, surface.width as i64) as u32;
    let max_y = (a[1].max(b[1]).max(c[1]).ceil() as i64).clamp(0, surface.height as i64) as u32;

    for y in min_y..max_y {
        for x in min_x..max_x {
            let p = [x as f32 + 0.5, y as f32 + 0.5];
            let w0 = edge(a, b, p) / area;
            let w1 = edge(b, c, p) / area;
            let w2 = edge(c, a, p) / area;
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                surface.put_pixel(x, y, rgba);
            }
        }
    }
}

/// Deterministic gradient source used by tests; the pattern shifts with each
/// tick so consecutive frames differ.
pub struct TestPattern {
    width: u32,
    height: u32,
    tick: u8,
}

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tick: 0,
        }
    }
}

impl FrameSource for TestPattern {
    fn resolution(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    fn next_views(&mut self) -> Result<Vec<RgbaSurface>> {
        self.tick = self.tick.wrapping_add(1);
        let mut surface = RgbaSurface::filled(self.width, self.height, [0, 0, 0, 0xff]);
        for y in 0..self.height {
            for x in 0..self.width {
                surface.put_pixel(x, y, [x as u8, y as u8, self.tick, 0xff]);
            }
        }
        Ok(vec![surface])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_scene_produces_one_full_surface() {
        let mut scene = CubeScene::new(64, 48, false);
        let views = scene.next_views().unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].width, 64);
        assert_eq!(views[0].height, 48);
        assert_eq!(views[0].pixels.len(), RgbaSurface::expected_len(64, 48));
    }

    #[test]
    fn stereo_scene_produces_two_differing_views() {
        let mut scene = CubeScene::new(64, 64, true);
        let views = scene.next_views().unwrap();
        assert_eq!(views.len(), 2);
        assert_ne!(views[0].pixels, views[1].pixels);
    }

    #[test]
    fn cube_covers_center_but_not_corners() {
        let mut scene = CubeScene::new(64, 64, false);
        let views = scene.next_views().unwrap();
        let view = &views[0];
        assert_ne!(view.pixel(32, 32).unwrap(), BACKGROUND);
        assert_eq!(view.pixel(0, 0).unwrap(), BACKGROUND);
        assert_eq!(view.pixel(63, 63).unwrap(), BACKGROUND);
    }

    #[test]
    fn rotation_advances_between_ticks() {
        let mut scene = CubeScene::new(32, 32, false);
        let first = scene.next_views().unwrap();
        // The per-tick step is tiny; advance far enough to change pixels.
        for _ in 0..500 {
            scene.next_views().unwrap();
        }
        let later = scene.next_views().unwrap();
        assert_ne!(first[0].pixels, later[0].pixels);
    }

    #[test]
    fn test_pattern_differs_every_tick() {
        let mut pattern = TestPattern::new(8, 8);
        let a = pattern.next_views().unwrap();
        let b = pattern.next_views().unwrap();
        assert_ne!(a[0].pixels, b[0].pixels);
        assert_eq!(a[0].pixels.len(), 8 * 8 * 4);
    }
}
