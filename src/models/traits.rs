use crate::models::common::{PlayerId, Vec3};

/// ワールド上のエンティティ（プレイヤー）のスナップショット
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub position: Vec3,
    /// エンティティの身長
    pub height: f64,
}

/// ブロック情報
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    /// バウンディングボックスが空かどうか（空気・草など）
    pub is_empty: bool,
}

/// インベントリ内のアイテムスタック
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub item_id: u32,
    pub count: u32,
}

/// 装備先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipSlot {
    Hand,
}

/// ナビゲーション要求のパラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigateOptions {
    /// 到着とみなす半径
    pub end_radius: f64,
    /// 経路探索のタイムアウト[ms]
    pub timeout_ms: u64,
}

/// ワールド照会のインターフェース
pub trait IWorldQuery {
    /// 指定プレイヤーのエンティティ（範囲外ならNone）
    fn entity_of(&self, username: &str) -> Option<Entity>;

    /// 指定位置のブロック（未ロードならNone）
    fn block_at(&self, position: Vec3) -> Option<Block>;

    /// 自分自身の現在位置
    fn self_position(&self) -> Vec3;
}

/// ナビゲーションのインターフェース
///
/// 到達失敗は戻り値ではなく `BotEvent::NavigationFailed` として通知されます。
pub trait INavigation {
    fn navigate_to(&mut self, point: Vec3, options: NavigateOptions);

    fn stop_navigation(&mut self);
}

/// 操作（視線・アイテム使用・装備）のインターフェース
pub trait IActuation {
    fn look_at(&mut self, point: Vec3);

    /// 手持ちアイテムの使用開始（弓を引く）
    fn activate_held_item(&mut self);

    /// 手持ちアイテムの使用終了（矢を放つ）
    fn deactivate_held_item(&mut self);

    fn equip(&mut self, item: &ItemStack, slot: EquipSlot);
}

/// チャット送信のインターフェース
pub trait ICommunication {
    fn broadcast(&mut self, message: &str);

    fn whisper(&mut self, username: &str, message: &str);
}

/// インベントリ照会のインターフェース
pub trait IInventory {
    fn count_item(&self, item_id: u32) -> u32;

    fn find_item(&self, item_id: u32) -> Option<ItemStack>;
}

/// コントローラが依存するクライアント能力の全体
pub trait IBotClient: IWorldQuery + INavigation + IActuation + ICommunication + IInventory {}

impl<T> IBotClient for T where T: IWorldQuery + INavigation + IActuation + ICommunication + IInventory {}

/// クライアントから届くイベント
#[derive(Debug, Clone, PartialEq)]
pub enum BotEvent {
    Spawn { spawn_point: Vec3 },
    Chat { username: PlayerId, message: String },
    Whisper { username: PlayerId },
    EntityGone { username: Option<PlayerId> },
    EntityMoved { username: Option<PlayerId>, position: Vec3 },
    SelfDeath,
    NavigationFailed,
}
