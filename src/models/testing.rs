//! テスト用の記録型クライアント
//!
//! すべての能力トレイトを実装し、発行されたコマンドを順番に記録します。

use std::collections::HashMap;

use crate::models::{
    common::Vec3,
    traits::{
        Block, Entity, EquipSlot, IActuation, ICommunication, IInventory, INavigation,
        IWorldQuery, ItemStack, NavigateOptions,
    },
};

/// 記録されたコマンド
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NavigateTo(Vec3, NavigateOptions),
    StopNavigation,
    LookAt(Vec3),
    Activate,
    Deactivate,
    Equip(u32),
    Broadcast(String),
    Whisper(String, String),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingClient {
    /// この高さ以下を固体とみなす（Noneなら全て空気）
    pub ground_level: Option<i64>,
    pub entities: HashMap<String, Entity>,
    pub inventory: HashMap<u32, u32>,
    pub position: Vec3,
    pub commands: Vec<Command>,
}

impl RecordingClient {
    pub fn with_ground(level: i64) -> Self {
        Self {
            ground_level: Some(level),
            ..Self::default()
        }
    }

    pub fn put_player(&mut self, username: &str, position: Vec3) {
        self.entities.insert(
            username.to_string(),
            Entity {
                position,
                height: 1.8,
            },
        );
    }

    pub fn remove_player(&mut self, username: &str) {
        self.entities.remove(username);
    }

    pub fn broadcasts(&self) -> Vec<String> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Broadcast(msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn whispers(&self) -> Vec<(String, String)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Whisper(user, msg) => Some((user.clone(), msg.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn navigations(&self) -> Vec<(Vec3, NavigateOptions)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::NavigateTo(p, o) => Some((*p, *o)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, command: &Command) -> usize {
        self.commands.iter().filter(|c| *c == command).count()
    }
}

impl IWorldQuery for RecordingClient {
    fn entity_of(&self, username: &str) -> Option<Entity> {
        self.entities.get(username).cloned()
    }

    fn block_at(&self, position: Vec3) -> Option<Block> {
        let (_, y, _) = position.floored();
        Some(Block {
            is_empty: self.ground_level.map_or(true, |level| y > level),
        })
    }

    fn self_position(&self) -> Vec3 {
        self.position
    }
}

impl INavigation for RecordingClient {
    fn navigate_to(&mut self, point: Vec3, options: NavigateOptions) {
        self.commands.push(Command::NavigateTo(point, options));
    }

    fn stop_navigation(&mut self) {
        self.commands.push(Command::StopNavigation);
    }
}

impl IActuation for RecordingClient {
    fn look_at(&mut self, point: Vec3) {
        self.commands.push(Command::LookAt(point));
    }

    fn activate_held_item(&mut self) {
        self.commands.push(Command::Activate);
    }

    fn deactivate_held_item(&mut self) {
        self.commands.push(Command::Deactivate);
    }

    fn equip(&mut self, item: &ItemStack, _slot: EquipSlot) {
        self.commands.push(Command::Equip(item.item_id));
    }
}

impl ICommunication for RecordingClient {
    fn broadcast(&mut self, message: &str) {
        self.commands.push(Command::Broadcast(message.to_string()));
    }

    fn whisper(&mut self, username: &str, message: &str) {
        self.commands
            .push(Command::Whisper(username.to_string(), message.to_string()));
    }
}

impl IInventory for RecordingClient {
    fn count_item(&self, item_id: u32) -> u32 {
        self.inventory.get(&item_id).copied().unwrap_or(0)
    }

    fn find_item(&self, item_id: u32) -> Option<ItemStack> {
        self.inventory.get(&item_id).map(|&count| ItemStack {
            item_id,
            count,
        })
    }
}
