#![allow(dead_code)]

use std::collections::HashMap;

use segmap3d::backend::{RenderBackend, ShaderStage, UniformLocation};
use segmap3d::builtin::{ATLAS_SENTINEL, COLOR_UNIFORMS};
use segmap3d::error::{Result, SegmentationError};

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A CPU surface holding BGRA pixels.
#[derive(Clone, Debug)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 4]>,
}

impl Surface {
    fn new(width: u32, height: u32) -> Self {
        Surface {
            width,
            height,
            pixels: vec![[0; 4]; width as usize * height as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels[(y * self.width + x) as usize]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    CompileShader(ShaderStage),
    LinkProgram,
    ReleaseShader(u32),
    UseProgram(Option<u32>),
    SetUniform(u32, i32),
    CreateTarget(u32, u32, u32),
    DestroyTarget(u32),
    BindTarget(Option<u32>),
    Clear,
    ReadPixels(Option<u32>, u32, u32),
}

#[derive(Debug, PartialEq, Eq)]
pub struct SoftShader(pub u32);
#[derive(Debug, PartialEq, Eq)]
pub struct SoftProgram(pub u32);
#[derive(Debug, PartialEq, Eq)]
pub struct SoftTarget(pub u32);

/// A software rasterizer good enough for axis-aligned rectangles.
///
/// Draws use the flat override color while the override program is active and the
/// color uniforms hold a non-sentinel color; otherwise the host color is kept.
pub struct SoftwareBackend {
    pub main: Surface,
    pub targets: HashMap<u32, Surface>,
    bound: Option<u32>,
    active_program: Option<u32>,
    uniforms: [i32; 3],
    next_id: u32,
    pub calls: Vec<Call>,
    pub fail_compile: Option<ShaderStage>,
    pub fail_link: bool,
    pub fail_allocation: bool,
    pub compile_count: usize,
    pub frames: usize,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        SoftwareBackend {
            main: Surface::new(width, height),
            targets: HashMap::new(),
            bound: None,
            active_program: None,
            uniforms: [0; 3],
            next_id: 1,
            calls: Vec::new(),
            fail_compile: None,
            fail_link: false,
            fail_allocation: false,
            compile_count: 0,
            frames: 0,
        }
    }

    pub fn resize_main(&mut self, width: u32, height: u32) {
        self.main = Surface::new(width, height);
    }

    pub fn active_program(&self) -> Option<u32> {
        self.active_program
    }

    pub fn uniforms(&self) -> [i32; 3] {
        self.uniforms
    }

    pub fn bound_target(&self) -> Option<u32> {
        self.bound
    }

    pub fn created_targets(&self) -> Vec<(u32, u32, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::CreateTarget(id, w, h) => Some((*id, *w, *h)),
                _ => None,
            })
            .collect()
    }

    pub fn destroyed_targets(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::DestroyTarget(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn uniform_pushes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::SetUniform(..)))
            .count()
    }

    /// Fills a rectangle of the bound surface, the way a host draw would.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, host_rgb: [u8; 3]) {
        let rgb = match self.active_program {
            Some(_) if self.uniforms != [ATLAS_SENTINEL; 3] => self.uniforms.map(|c| c as u8),
            _ => host_rgb,
        };
        let bgra = [rgb[2], rgb[1], rgb[0], 255];

        let surface = match self.bound {
            Some(id) => self.targets.get_mut(&id).expect("bound target exists"),
            None => &mut self.main,
        };
        for py in y..(y + h).min(surface.height) {
            for px in x..(x + w).min(surface.width) {
                let i = (py * surface.width + px) as usize;
                surface.pixels[i] = bgra;
            }
        }
    }

    fn fresh_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl RenderBackend for SoftwareBackend {
    type Shader = SoftShader;
    type Program = SoftProgram;
    type Target = SoftTarget;

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        _label: &str,
        source: &str,
    ) -> std::result::Result<SoftShader, String> {
        self.calls.push(Call::CompileShader(stage));
        self.compile_count += 1;
        if self.fail_compile == Some(stage) || source.is_empty() {
            return Err(format!("{:?}: syntax error", stage));
        }
        Ok(SoftShader(self.fresh_id()))
    }

    fn link_program(
        &mut self,
        _label: &str,
        _vertex: &SoftShader,
        _fragment: &SoftShader,
    ) -> std::result::Result<SoftProgram, String> {
        self.calls.push(Call::LinkProgram);
        if self.fail_link {
            return Err("unresolved varying".to_string());
        }
        Ok(SoftProgram(self.fresh_id()))
    }

    fn uniform_location(&self, _program: &SoftProgram, name: &str) -> Option<UniformLocation> {
        COLOR_UNIFORMS
            .iter()
            .position(|n| *n == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn release_shader(&mut self, shader: SoftShader) {
        self.calls.push(Call::ReleaseShader(shader.0));
    }

    fn use_program(&mut self, program: Option<&SoftProgram>) {
        self.active_program = program.map(|p| p.0);
        self.calls.push(Call::UseProgram(self.active_program));
    }

    fn set_uniform_i32(&mut self, _program: &SoftProgram, location: UniformLocation, value: i32) {
        self.uniforms[location.0 as usize] = value;
        self.calls.push(Call::SetUniform(location.0, value));
    }

    fn main_target_size(&self) -> (u32, u32) {
        (self.main.width, self.main.height)
    }

    fn create_target(&mut self, width: u32, height: u32) -> Result<SoftTarget> {
        if self.fail_allocation {
            return Err(SegmentationError::allocation(width, height, "out of memory"));
        }
        let id = self.fresh_id();
        self.targets.insert(id, Surface::new(width, height));
        self.calls.push(Call::CreateTarget(id, width, height));
        Ok(SoftTarget(id))
    }

    fn destroy_target(&mut self, target: SoftTarget) {
        self.targets.remove(&target.0);
        self.calls.push(Call::DestroyTarget(target.0));
    }

    fn bind_target(&mut self, target: Option<&SoftTarget>) {
        self.bound = target.map(|t| t.0);
        self.calls.push(Call::BindTarget(self.bound));
    }

    fn clear_bound_target(&mut self, rgba: [f32; 4]) {
        let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        let bgra = [to_byte(rgba[2]), to_byte(rgba[1]), to_byte(rgba[0]), to_byte(rgba[3])];
        let surface = match self.bound {
            Some(id) => self.targets.get_mut(&id).expect("bound target exists"),
            None => &mut self.main,
        };
        surface.pixels.iter_mut().for_each(|p| *p = bgra);
        self.calls.push(Call::Clear);
    }

    fn read_pixels(
        &mut self,
        source: Option<&SoftTarget>,
        width: u32,
        height: u32,
        out: &mut [u8],
    ) -> Result<()> {
        self.calls
            .push(Call::ReadPixels(source.map(|t| t.0), width, height));
        let surface = match source {
            Some(t) => self
                .targets
                .get(&t.0)
                .ok_or_else(|| SegmentationError::readback("unknown target"))?,
            None => &self.main,
        };
        for y in 0..height {
            for x in 0..width {
                let i = ((y * width + x) * 4) as usize;
                out[i..i + 4].copy_from_slice(&surface.pixel(x, y));
            }
        }
        Ok(())
    }

    fn end_frame(&mut self) {
        self.frames += 1;
    }
}
