//! Hook taxonomy
//!
//! The closed set of hook categories and, for each of them, the stable
//! numeric event ids scripts register against. Ids are part of the script
//! contract and never change; retired ids are left as gaps.

use std::fmt::Debug;
use std::hash::Hash;

/// Common behaviour of every per-category event enum
pub trait HookEvent: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Every event id of the category, in ascending order
    const ALL: &'static [Self];

    fn from_id(id: u32) -> Option<Self>;

    fn id(self) -> u32;

    /// Readable name used in logs
    fn name(self) -> &'static str;
}

macro_rules! hook_events {
    (
        $(#[$meta:meta])*
        $enum_name:ident {
            $($variant:ident = $value:literal => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u32)]
        pub enum $enum_name {
            $($variant = $value,)+
        }

        impl HookEvent for $enum_name {
            const ALL: &'static [Self] = &[$(Self::$variant,)+];

            fn from_id(id: u32) -> Option<Self> {
                match id {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn id(self) -> u32 {
                self as u32
            }

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }
    };
}

/// Registration category, as passed through to error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RegisterType {
    Packet = 0,
    Server = 1,
    Player = 2,
    Guild = 3,
    Group = 4,
    Creature = 5,
    Vehicle = 6,
    CreatureGossip = 7,
    GameObject = 8,
    GameObjectGossip = 9,
    Item = 10,
    ItemGossip = 11,
    PlayerGossip = 12,
    Battleground = 13,
    // Categories below were added after the numbering above was fixed
    CreatureUnique = 14,
    Spell = 15,
    Map = 16,
    Instance = 17,
}

impl RegisterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Packet => "packet",
            Self::Server => "server",
            Self::Player => "player",
            Self::Guild => "guild",
            Self::Group => "group",
            Self::Creature => "creature",
            Self::CreatureUnique => "unique creature",
            Self::Vehicle => "vehicle",
            Self::CreatureGossip => "creature gossip",
            Self::GameObject => "gameobject",
            Self::GameObjectGossip => "gameobject gossip",
            Self::Spell => "spell",
            Self::Item => "item",
            Self::ItemGossip => "item gossip",
            Self::PlayerGossip => "player gossip",
            Self::Battleground => "battleground",
            Self::Map => "map",
            Self::Instance => "instance",
        }
    }
}

hook_events! {
    /// Packet events, keyed by opcode
    PacketEvent {
        OnPacketReceive = 5 => "on_packet_receive",
        OnPacketReceiveUnknown = 6 => "on_packet_receive_unknown",
        OnPacketSend = 7 => "on_packet_send",
    }
}

hook_events! {
    /// Server and world events
    ServerEvent {
        OnNetworkStart = 1 => "on_network_start",
        OnNetworkStop = 2 => "on_network_stop",
        OnSocketOpen = 3 => "on_socket_open",
        OnSocketClose = 4 => "on_socket_close",
        OnPacketReceive = 5 => "on_packet_receive",
        OnPacketReceiveUnknown = 6 => "on_packet_receive_unknown",
        OnPacketSend = 7 => "on_packet_send",
        OnOpenStateChange = 8 => "on_open_state_change",
        OnConfigLoad = 9 => "on_config_load",
        OnShutdownInit = 11 => "on_shutdown_init",
        OnShutdownCancel = 12 => "on_shutdown_cancel",
        OnUpdate = 13 => "on_update",
        OnStartup = 14 => "on_startup",
        OnShutdown = 15 => "on_shutdown",
        OnLuaStateClose = 16 => "on_lua_state_close",
        OnMapCreate = 17 => "on_map_create",
        OnMapDestroy = 18 => "on_map_destroy",
        OnGridLoad = 19 => "on_grid_load",
        OnGridUnload = 20 => "on_grid_unload",
        OnPlayerEnterMap = 21 => "on_player_enter_map",
        OnPlayerLeaveMap = 22 => "on_player_leave_map",
        OnMapUpdate = 23 => "on_map_update",
        OnTrigger = 24 => "on_trigger",
        OnWeatherChange = 25 => "on_weather_change",
        OnAuctionAdd = 26 => "on_auction_add",
        OnAuctionRemove = 27 => "on_auction_remove",
        OnAuctionSuccessful = 28 => "on_auction_successful",
        OnAuctionExpire = 29 => "on_auction_expire",
        OnAddonMessage = 30 => "on_addon_message",
        OnDeleteCreature = 31 => "on_delete_creature",
        OnDeleteGameObject = 32 => "on_delete_gameobject",
        OnLuaStateOpen = 33 => "on_lua_state_open",
        OnGameEventStart = 34 => "on_game_event_start",
        OnGameEventStop = 35 => "on_game_event_stop",
    }
}

hook_events! {
    /// Player events
    PlayerEvent {
        OnCharacterCreate = 1 => "on_character_create",
        OnCharacterDelete = 2 => "on_character_delete",
        OnLogin = 3 => "on_login",
        OnLogout = 4 => "on_logout",
        OnSpellCast = 5 => "on_spell_cast",
        OnKillPlayer = 6 => "on_kill_player",
        OnKillCreature = 7 => "on_kill_creature",
        OnKilledByCreature = 8 => "on_killed_by_creature",
        OnDuelRequest = 9 => "on_duel_request",
        OnDuelStart = 10 => "on_duel_start",
        OnDuelEnd = 11 => "on_duel_end",
        OnGiveXp = 12 => "on_give_xp",
        OnLevelChange = 13 => "on_level_change",
        OnMoneyChange = 14 => "on_money_change",
        OnReputationChange = 15 => "on_reputation_change",
        OnTalentsChange = 16 => "on_talents_change",
        OnTalentsReset = 17 => "on_talents_reset",
        OnChat = 18 => "on_chat",
        OnWhisper = 19 => "on_whisper",
        OnGroupChat = 20 => "on_group_chat",
        OnGuildChat = 21 => "on_guild_chat",
        OnChannelChat = 22 => "on_channel_chat",
        OnEmote = 23 => "on_emote",
        OnTextEmote = 24 => "on_text_emote",
        OnSave = 25 => "on_save",
        OnBindToInstance = 26 => "on_bind_to_instance",
        OnUpdateZone = 27 => "on_update_zone",
        OnMapChange = 28 => "on_map_change",
        OnEquip = 29 => "on_equip",
        OnFirstLogin = 30 => "on_first_login",
        OnCanUseItem = 31 => "on_can_use_item",
        OnLootItem = 32 => "on_loot_item",
        OnEnterCombat = 33 => "on_enter_combat",
        OnLeaveCombat = 34 => "on_leave_combat",
        OnRepop = 35 => "on_repop",
        OnResurrect = 36 => "on_resurrect",
        OnLootMoney = 37 => "on_loot_money",
        OnQuestAbandon = 38 => "on_quest_abandon",
        OnLearnTalents = 39 => "on_learn_talents",
        OnEnvironmentalDeath = 40 => "on_environmental_death",
        OnTradeAccept = 41 => "on_trade_accept",
        OnCommand = 42 => "on_command",
        OnSkillChange = 43 => "on_skill_change",
        OnLearnSpell = 44 => "on_learn_spell",
        OnAchievementComplete = 45 => "on_achievement_complete",
        OnDiscoverArea = 46 => "on_discover_area",
        OnUpdateArea = 47 => "on_update_area",
        OnTradeInit = 48 => "on_trade_init",
        OnSendMail = 49 => "on_send_mail",
        OnQuestStatusChanged = 54 => "on_quest_status_changed",
    }
}

hook_events! {
    /// Guild events
    GuildEvent {
        OnAddMember = 1 => "on_add_member",
        OnRemoveMember = 2 => "on_remove_member",
        OnMotdChange = 3 => "on_motd_change",
        OnInfoChange = 4 => "on_info_change",
        OnCreate = 5 => "on_create",
        OnDisband = 6 => "on_disband",
        OnMoneyWithdraw = 7 => "on_money_withdraw",
        OnMoneyDeposit = 8 => "on_money_deposit",
        OnItemMove = 9 => "on_item_move",
        OnEvent = 10 => "on_event",
        OnBankEvent = 11 => "on_bank_event",
    }
}

hook_events! {
    /// Group events
    GroupEvent {
        OnMemberAdd = 1 => "on_member_add",
        OnMemberInvite = 2 => "on_member_invite",
        OnMemberRemove = 3 => "on_member_remove",
        OnLeaderChange = 4 => "on_leader_change",
        OnDisband = 5 => "on_disband",
        OnCreate = 6 => "on_create",
        OnMemberAccept = 7 => "on_member_accept",
    }
}

hook_events! {
    /// Vehicle events
    VehicleEvent {
        OnInstall = 1 => "on_install",
        OnUninstall = 2 => "on_uninstall",
        OnInstallAccessory = 4 => "on_install_accessory",
        OnAddPassenger = 5 => "on_add_passenger",
        OnRemovePassenger = 6 => "on_remove_passenger",
    }
}

hook_events! {
    /// Creature events, used by both entry and unique-object bindings
    CreatureEvent {
        OnEnterCombat = 1 => "on_enter_combat",
        OnLeaveCombat = 2 => "on_leave_combat",
        OnTargetDied = 3 => "on_target_died",
        OnDied = 4 => "on_died",
        OnSpawn = 5 => "on_spawn",
        OnReachWp = 6 => "on_reach_wp",
        OnAiUpdate = 7 => "on_aiupdate",
        OnReceiveEmote = 8 => "on_receive_emote",
        OnDamageTaken = 9 => "on_damage_taken",
        OnPreCombat = 10 => "on_pre_combat",
        OnOwnerAttacked = 12 => "on_owner_attacked",
        OnOwnerAttackedAt = 13 => "on_owner_attacked_at",
        OnHitBySpell = 14 => "on_hit_by_spell",
        OnSpellHitTarget = 15 => "on_spell_hit_target",
        OnJustSummonedCreature = 19 => "on_just_summoned_creature",
        OnSummonedCreatureDespawn = 20 => "on_summoned_creature_despawn",
        OnSummonedCreatureDied = 21 => "on_summoned_creature_died",
        OnSummoned = 22 => "on_summoned",
        OnReset = 23 => "on_reset",
        OnReachHome = 24 => "on_reach_home",
        OnCorpseRemoved = 26 => "on_corpse_removed",
        OnMoveInLos = 27 => "on_move_in_los",
        OnDummyEffect = 30 => "on_dummy_effect",
        OnQuestAccept = 31 => "on_quest_accept",
        OnQuestReward = 34 => "on_quest_reward",
        OnDialogStatus = 35 => "on_dialog_status",
        OnAdd = 36 => "on_add",
        OnRemove = 37 => "on_remove",
    }
}

hook_events! {
    /// Game object events
    GameObjectEvent {
        OnAiUpdate = 1 => "on_aiupdate",
        OnSpawn = 2 => "on_spawn",
        OnDummyEffect = 3 => "on_dummy_effect",
        OnQuestAccept = 4 => "on_quest_accept",
        OnQuestReward = 5 => "on_quest_reward",
        OnDialogStatus = 6 => "on_dialog_status",
        OnDestroyed = 7 => "on_destroyed",
        OnDamaged = 8 => "on_damaged",
        OnLootStateChange = 9 => "on_loot_state_change",
        OnGoStateChanged = 10 => "on_go_state_changed",
        OnAdd = 12 => "on_add",
        OnRemove = 13 => "on_remove",
        OnUse = 14 => "on_use",
    }
}

hook_events! {
    /// Spell events
    SpellEvent {
        OnCast = 1 => "on_cast",
    }
}

hook_events! {
    /// Item events
    ItemEvent {
        OnDummyEffect = 1 => "on_dummy_effect",
        OnUse = 2 => "on_use",
        OnQuestAccept = 3 => "on_quest_accept",
        OnExpire = 4 => "on_expire",
        OnRemove = 5 => "on_remove",
        OnAdd = 6 => "on_add",
        OnEquip = 7 => "on_equip",
        OnUnequip = 8 => "on_unequip",
    }
}

hook_events! {
    /// Gossip events, shared by creature, gameobject, item and player gossip
    GossipEvent {
        OnHello = 1 => "on_hello",
        OnSelect = 2 => "on_select",
    }
}

hook_events! {
    /// Battleground events
    BattlegroundEvent {
        OnStart = 1 => "on_start",
        OnEnd = 2 => "on_end",
        OnCreate = 3 => "on_create",
        OnPreDestroy = 4 => "on_pre_destroy",
    }
}

hook_events! {
    /// Map and instance events, keyed by map id
    InstanceEvent {
        OnInitialize = 1 => "on_initialize",
        OnLoad = 2 => "on_load",
        OnUpdate = 3 => "on_update",
        OnPlayerEnter = 4 => "on_player_enter",
        OnCreatureCreate = 5 => "on_creature_create",
        OnGameObjectCreate = 6 => "on_gameobject_create",
        OnCheckEncounterInProgress = 7 => "on_check_encounter_in_progress",
    }
}
