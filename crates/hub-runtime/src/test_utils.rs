//! In-memory port implementations for tests.
//!
//! Every double is a cheap clone over shared state, so a test keeps one
//! clone for inspection and hands the other to the hub.

use crate::loader::{executable_path, LoaderError};
use crate::ports::{ChildProcess, ConfigCache, FrameSink, ProcessLauncher, TimerKey, TimerService};
use onb_protocol::domain::svc;
use onb_protocol::{Header, ObjectDescription, ObjectFlags, Packet, ValueType};
use parking_lot::Mutex;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// TIMERS
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct RecordingTimers {
    armed: Arc<Mutex<BTreeMap<TimerKey, Duration>>>,
}

impl RecordingTimers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn period(&self, key: &TimerKey) -> Option<Duration> {
        self.armed.lock().get(key).copied()
    }

    #[must_use]
    pub fn is_armed(&self, key: &TimerKey) -> bool {
        self.armed.lock().contains_key(key)
    }

    #[must_use]
    pub fn armed(&self) -> Vec<TimerKey> {
        self.armed.lock().keys().cloned().collect()
    }
}

impl TimerService for RecordingTimers {
    fn arm(&mut self, key: TimerKey, period: Duration) {
        self.armed.lock().insert(key, period);
    }

    fn cancel(&mut self, key: &TimerKey) {
        self.armed.lock().remove(key);
    }
}

// =============================================================================
// FRAMES
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct RecordingFrames {
    frames: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl RecordingFrames {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every frame sent so far, decoded.
    #[must_use]
    pub fn take(&self) -> Vec<(String, Packet)> {
        self.frames
            .lock()
            .drain(..)
            .filter_map(|(module, frame)| Packet::decode(&frame).ok().map(|p| (module, p)))
            .collect()
    }

    /// Take the frames sent to one module, leaving the others queued.
    #[must_use]
    pub fn take_for(&self, module: &str) -> Vec<Packet> {
        let mut frames = self.frames.lock();
        let (mine, rest): (Vec<_>, Vec<_>) = frames.drain(..).partition(|(m, _)| m == module);
        *frames = rest;
        mine.into_iter()
            .filter_map(|(_, frame)| Packet::decode(&frame).ok())
            .collect()
    }
}

impl FrameSink for RecordingFrames {
    fn send(&mut self, module: &str, frame: Vec<u8>) -> bool {
        self.frames.lock().push((module.to_string(), frame));
        true
    }
}

// =============================================================================
// CONFIG CACHE
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigCache {
    configs: Arc<Mutex<BTreeMap<String, BTreeMap<String, Json>>>>,
    icons: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryConfigCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn icon(&self, module: &str) -> Option<Vec<u8>> {
        self.icons.lock().get(module).cloned()
    }
}

impl ConfigCache for InMemoryConfigCache {
    fn module_exists(&self, module: &str) -> bool {
        self.configs.lock().contains_key(module)
    }

    fn write_component(&mut self, module: &str, type_name: &str, info: &Json) -> Result<bool, LoaderError> {
        let mut configs = self.configs.lock();
        let classes = configs.entry(module.to_string()).or_default();
        if classes.contains_key(type_name) {
            return Ok(false);
        }
        classes.insert(type_name.to_string(), info.clone());
        Ok(true)
    }

    fn write_icon(&mut self, module: &str, icon: &[u8]) -> Result<bool, LoaderError> {
        self.configs.lock().entry(module.to_string()).or_default();
        let mut icons = self.icons.lock();
        if icons.contains_key(module) {
            return Ok(false);
        }
        icons.insert(module.to_string(), icon.to_vec());
        Ok(true)
    }

    fn remove_module(&mut self, module: &str) -> Result<(), LoaderError> {
        self.configs.lock().remove(module);
        self.icons.lock().remove(module);
        Ok(())
    }

    fn read_all(&self) -> Result<BTreeMap<String, BTreeMap<String, Json>>, LoaderError> {
        Ok(self.configs.lock().clone())
    }
}

// =============================================================================
// PROCESSES
// =============================================================================

#[derive(Debug, Default)]
struct LauncherState {
    spawned: Vec<(String, Vec<String>, PathBuf)>,
    killed: Vec<String>,
    exits: BTreeMap<String, i32>,
    next_pid: u32,
}

/// Records spawns and kills; [`RecordingLauncher::exit`] simulates a
/// process ending on its own.
#[derive(Debug, Clone, Default)]
pub struct RecordingLauncher {
    state: Arc<Mutex<LauncherState>>,
}

impl RecordingLauncher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the spawned modules, in spawn order.
    #[must_use]
    pub fn spawned(&self) -> Vec<String> {
        self.state.lock().spawned.iter().map(|(m, _, _)| m.clone()).collect()
    }

    /// Arguments and working directory of the last spawn of `module`.
    #[must_use]
    pub fn invocation(&self, module: &str) -> Option<(Vec<String>, PathBuf)> {
        self.state
            .lock()
            .spawned
            .iter()
            .rev()
            .find(|(m, _, _)| m == module)
            .map(|(_, args, dir)| (args.clone(), dir.clone()))
    }

    #[must_use]
    pub fn killed(&self) -> Vec<String> {
        self.state.lock().killed.clone()
    }

    pub fn exit(&self, module: &str, code: i32) {
        self.state.lock().exits.insert(module.to_string(), code);
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn spawn(
        &mut self,
        module: &str,
        _program: &Path,
        args: &[String],
        working_dir: &Path,
    ) -> Result<Box<dyn ChildProcess>, LoaderError> {
        let mut state = self.state.lock();
        state.next_pid += 1;
        state
            .spawned
            .push((module.to_string(), args.to_vec(), working_dir.to_path_buf()));
        Ok(Box::new(RecordedChild {
            module: module.to_string(),
            pid: state.next_pid,
            state: Arc::clone(&self.state),
        }))
    }
}

struct RecordedChild {
    module: String,
    pid: u32,
    state: Arc<Mutex<LauncherState>>,
}

impl ChildProcess for RecordedChild {
    fn id(&self) -> u32 {
        self.pid
    }

    fn try_wait(&mut self) -> Result<Option<i32>, LoaderError> {
        Ok(self.state.lock().exits.remove(&self.module))
    }

    fn kill_and_wait(&mut self) -> Result<(), LoaderError> {
        self.state.lock().killed.push(self.module.clone());
        Ok(())
    }
}

/// Create an (empty) executable for `name` under `modules_dir`.
pub fn install_module(modules_dir: &Path, name: &str) -> std::io::Result<PathBuf> {
    let path = executable_path(modules_dir, name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, b"")?;
    Ok(path)
}

// =============================================================================
// SIMULATED MODULE
// =============================================================================

/// One object a simulated class exposes, with an optional `ExtInfo` RMIP.
#[derive(Debug, Clone)]
pub struct SimObject {
    pub desc: ObjectDescription,
    pub rmip: Option<u16>,
}

impl SimObject {
    fn new(id: u8, name: &str, flags: u8, read: ValueType, write: ValueType) -> Self {
        let size = |ty: ValueType| ty.scalar_size().and_then(|s| u16::try_from(s).ok()).unwrap_or(0);
        Self {
            desc: ObjectDescription {
                id,
                flags: ObjectFlags(flags),
                ext_flags: 0,
                read_type: read,
                write_type: write,
                read_size: size(read),
                write_size: size(write),
                name: name.to_string(),
            },
            rmip: None,
        }
    }

    /// Volatile output the component writes.
    #[must_use]
    pub fn output(id: u8, name: &str, ty: ValueType) -> Self {
        Self::new(id, name, ObjectFlags::VOLATILE | ObjectFlags::WRITE, ValueType::Void, ty)
    }

    /// Volatile input the component reads.
    #[must_use]
    pub fn input(id: u8, name: &str, ty: ValueType) -> Self {
        Self::new(id, name, ObjectFlags::VOLATILE | ObjectFlags::READ, ty, ValueType::Void)
    }

    /// Persistent setting.
    #[must_use]
    pub fn setting(id: u8, name: &str, ty: ValueType) -> Self {
        Self::new(
            id,
            name,
            ObjectFlags::READ | ObjectFlags::WRITE | ObjectFlags::SAVE,
            ty,
            ty,
        )
    }

    /// Declare a minimum interval between publications.
    #[must_use]
    pub fn with_rmip(mut self, rmip: u16) -> Self {
        self.desc.ext_flags |= 1 << 8;
        self.rmip = Some(rmip);
        self
    }
}

#[derive(Debug, Clone)]
struct SimClass {
    class_id: u32,
    type_name: String,
    objects: Vec<SimObject>,
}

/// Builds the frames a real module would send, so the hub can be driven
/// without a process or a socket.
#[derive(Debug, Clone, Default)]
pub struct SimulatedModule {
    classes: Vec<SimClass>,
}

impl SimulatedModule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory class.
    #[must_use]
    pub fn with_class(mut self, class_id: u32, type_name: &str, objects: Vec<SimObject>) -> Self {
        self.classes.push(SimClass {
            class_id,
            type_name: type_name.to_string(),
            objects,
        });
        self
    }

    /// Answers to the class enumeration; the module is ready afterwards.
    #[must_use]
    pub fn class_frames(&self) -> Vec<Vec<u8>> {
        if self.classes.is_empty() {
            return vec![Packet::new(Header::service(svc::CLASS, 0), Vec::new())
                .into_class_channel()
                .encode()];
        }
        // every class id first, so readiness is reached only once
        let addressed = || {
            self.classes
                .iter()
                .enumerate()
                .map(|(index, class)| (u16::try_from(index + 1).unwrap_or(u16::MAX), class))
        };
        let mut frames: Vec<Vec<u8>> = addressed()
            .map(|(address, class)| {
                Packet::new(
                    Header::service(svc::CLASS, address),
                    class.class_id.to_le_bytes().to_vec(),
                )
                .into_class_channel()
                .encode()
            })
            .collect();
        for (address, class) in addressed() {
            frames.extend(
                Self::identity(address, class, "")
                    .into_iter()
                    .map(|p| p.into_class_channel().encode()),
            );
        }
        frames
    }

    /// A new component announcing itself.
    #[must_use]
    pub fn hello() -> Vec<u8> {
        Packet::empty(Header::service(svc::HELLO, 0)).encode()
    }

    /// Answers of component `id` of class `type_name` to the hub's info
    /// requests. Empty if the class is unknown.
    #[must_use]
    pub fn component_frames(&self, id: u16, type_name: &str, name: &str) -> Vec<Vec<u8>> {
        self.classes
            .iter()
            .find(|c| c.type_name == type_name)
            .map(|class| {
                Self::identity(id, class, name)
                    .into_iter()
                    .map(|p| p.encode())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The module reporting a component gone.
    #[must_use]
    pub fn kill(id: u16) -> Vec<u8> {
        Packet::empty(Header::service(svc::KILL, id)).encode()
    }

    /// A data publication.
    #[must_use]
    pub fn data(id: u16, oid: u8, payload: &[u8]) -> Vec<u8> {
        Packet::new(Header::data(oid, id), payload.to_vec()).encode()
    }

    #[must_use]
    pub fn icon(bytes: &[u8]) -> Vec<u8> {
        Packet::new(Header::service(svc::ICON, 0), bytes.to_vec()).encode()
    }

    fn identity(address: u16, class: &SimClass, name: &str) -> Vec<Packet> {
        let reply = |oid: u8, data: Vec<u8>| Packet::new(Header::service(oid, address), data);
        let count = u8::try_from(class.objects.len()).unwrap_or(u8::MAX);
        let mut packets = vec![
            reply(svc::CLASS, class.class_id.to_le_bytes().to_vec()),
            reply(svc::NAME, name.as_bytes().to_vec()),
            reply(svc::SERIAL, 0u32.to_le_bytes().to_vec()),
            reply(svc::CLASS_NAME, class.type_name.as_bytes().to_vec()),
            reply(svc::OBJECT_COUNT, vec![count]),
        ];
        for object in &class.objects {
            packets.push(reply(svc::OBJECT_INFO, object.desc.encode()));
            if let Some(rmip) = object.rmip {
                let mut meta = vec![object.desc.id];
                meta.extend_from_slice(&rmip.to_le_bytes());
                meta.push(0);
                packets.push(reply(svc::OBJECT_META_FIRST + 8, meta));
            }
        }
        packets
    }
}
