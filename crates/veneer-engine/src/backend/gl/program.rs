use anyhow::{Context as _, Result, anyhow};
use glow::HasContext;

use crate::geometry::{ShaderType, TEXTURE_SLOTS};

const COMMON_GLSL: &str = include_str!("../shaders/common.glsl");
const FILL_VERT: &str = include_str!("../shaders/fill.vert");
const FILL_FRAG: &str = include_str!("../shaders/fill.frag");
const PATH_VERT: &str = include_str!("../shaders/path.vert");
const PATH_FRAG: &str = include_str!("../shaders/path.frag");

/// Uniform buffer binding point of the `Uniforms` block.
pub(super) const UNIFORMS_BINDING: u32 = 0;

const SAMPLER_NAMES: [&str; TEXTURE_SLOTS] = ["Texture0", "Texture1", "Texture2"];

/// Prepends the version line and the shared uniform block to a stage body.
fn stage_source(body: &str) -> String {
    format!("#version 330 core\n{COMMON_GLSL}\n{body}")
}

/// The two linked programs, one per [`ShaderType`].
pub(super) struct Programs {
    fill: glow::Program,
    path: glow::Program,
}

impl Programs {
    pub fn new(gl: &glow::Context) -> Result<Self> {
        let fill = link(gl, "fill", FILL_VERT, FILL_FRAG)?;
        let path = match link(gl, "path", PATH_VERT, PATH_FRAG) {
            Ok(path) => path,
            Err(err) => {
                unsafe { gl.delete_program(fill) };
                return Err(err);
            }
        };
        Ok(Self { fill, path })
    }

    #[inline]
    pub fn get(&self, shader: ShaderType) -> glow::Program {
        match shader {
            ShaderType::Fill => self.fill,
            ShaderType::FillPath => self.path,
        }
    }

    pub fn delete(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_program(self.fill);
            gl.delete_program(self.path);
        }
    }
}

fn compile(gl: &glow::Context, stage: u32, label: &str, body: &str) -> Result<glow::Shader> {
    unsafe {
        let shader = gl
            .create_shader(stage)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("failed to create {label} shader"))?;
        gl.shader_source(shader, &stage_source(body));
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(anyhow!("{label} shader failed to compile: {log}"));
        }
        Ok(shader)
    }
}

fn link(gl: &glow::Context, label: &str, vert: &str, frag: &str) -> Result<glow::Program> {
    let vs = compile(gl, glow::VERTEX_SHADER, &format!("{label} vertex"), vert)?;
    let fs = match compile(gl, glow::FRAGMENT_SHADER, &format!("{label} fragment"), frag) {
        Ok(fs) => fs,
        Err(err) => {
            unsafe { gl.delete_shader(vs) };
            return Err(err);
        }
    };

    unsafe {
        let program = match gl.create_program() {
            Ok(program) => program,
            Err(err) => {
                gl.delete_shader(vs);
                gl.delete_shader(fs);
                return Err(anyhow!(err)).with_context(|| format!("failed to create {label} program"));
            }
        };
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);
        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(anyhow!("{label} program failed to link: {log}"));
        }

        let block = gl
            .get_uniform_block_index(program, "Uniforms")
            .with_context(|| format!("{label} program has no Uniforms block"))?;
        gl.uniform_block_binding(program, block, UNIFORMS_BINDING);

        gl.use_program(Some(program));
        for (unit, name) in SAMPLER_NAMES.iter().enumerate() {
            // optimized out when the stage never samples it
            if let Some(location) = gl.get_uniform_location(program, name) {
                gl.uniform_1_i32(Some(&location), unit as i32);
            }
        }
        gl.use_program(None);

        log::debug!("linked {label} program");
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_share_the_uniform_block() {
        let fill = stage_source(FILL_FRAG);
        let path = stage_source(PATH_VERT);
        assert!(fill.starts_with("#version 330 core\n"));
        assert!(fill.contains("uniform Uniforms"));
        assert!(path.contains("uniform Uniforms"));
        for name in SAMPLER_NAMES {
            assert!(FILL_FRAG.contains(name), "{name} missing from fill.frag");
        }
    }
}
