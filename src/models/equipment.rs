use tracing::trace;

use crate::models::traits::{EquipSlot, IActuation, IInventory};

/// 戦闘準備（弓と矢）の判定
#[derive(Debug, Clone, Copy)]
pub struct EquipmentGate {
    pub weapon_item: u32,
    pub ammo_item: u32,
    /// 準備完了に必要な矢の本数
    pub min_ammo: u32,
}

impl EquipmentGate {
    pub fn new(weapon_item: u32, ammo_item: u32, min_ammo: u32) -> Self {
        Self {
            weapon_item,
            ammo_item,
            min_ammo,
        }
    }

    /// 戦闘準備ができているか
    ///
    /// 武器が見つかれば毎回手に装備します（冪等な副作用）。
    /// 武器があり、かつ矢が`min_ammo`本以上ならtrueです。
    pub fn is_ready<C>(&self, client: &mut C) -> bool
    where
        C: IInventory + IActuation + ?Sized,
    {
        let weapon = client.find_item(self.weapon_item);
        let ammo = client.count_item(self.ammo_item);

        if let Some(stack) = &weapon {
            client.equip(stack, EquipSlot::Hand);
        }

        trace!(
            "装備確認: 武器={}個, 矢={}本",
            weapon.as_ref().map_or(0, |stack| stack.count),
            ammo
        );
        weapon.is_some() && ammo >= self.min_ammo
    }
}
